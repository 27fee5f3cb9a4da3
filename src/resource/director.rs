//! Mounts the archives of a game install in override order and swaps module archives on every
//! module transition.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::resources::{Resources, ResourcesError};
use crate::cache::typed::{Gffs, LetterTables, TalkTables, TwoDas};
use crate::format::gff::Gff;
use crate::format::tlk::{TalkTable, TalkTableError, TalkTableReader};
use crate::format::two_da::TwoDa;
use crate::misc::resource_type::ResourceType;
use crate::utils::{find_path_ignore_case, get_file_as_byte_vec, read_file_paths};

const KEY_FILENAME: &str = "chitin.key";
const PATCH_FILENAME: &str = "patch.erf";
const TALK_TABLE_FILENAME: &str = "dialog.tlk";
const TEXTURE_PACK_DIRECTORY: &str = "texturepacks";
const TEXTURE_PACK_GUI: &str = "swpc_tex_gui.erf";
const MUSIC_DIRECTORY: &str = "streammusic";
const SOUNDS_DIRECTORY: &str = "streamsounds";
const WAVES_DIRECTORY: &str = "streamwaves";
const VOICE_DIRECTORY: &str = "streamvoice";
const LIPS_DIRECTORY: &str = "lips";
const MODULES_DIRECTORY: &str = "modules";
const OVERRIDE_DIRECTORY: &str = "override";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum GameId {
    #[default]
    Kotor,
    Tsl,
}

impl GameId {
    pub fn executable(&self) -> &'static str {
        match self {
            GameId::Kotor => "swkotor.exe",
            GameId::Tsl => "swkotor2.exe",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum TextureQuality {
    #[default]
    High,
    Medium,
    Low,
}

impl TextureQuality {
    /// The texture pack holding the textures of this quality.
    pub fn texture_pack(&self) -> &'static str {
        match self {
            TextureQuality::High => "swpc_tex_tpa.erf",
            TextureQuality::Medium => "swpc_tex_tpb.erf",
            TextureQuality::Low => "swpc_tex_tpc.erf",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DirectorOptions {
    pub game_path: PathBuf,
    pub game_id: GameId,
    pub texture_quality: TextureQuality,
    /// ERF with precompiled shaders, mounted right above `chitin.key`.
    pub shader_pack: Option<PathBuf>,
}

impl DirectorOptions {
    pub fn new(game_path: impl Into<PathBuf>, game_id: GameId) -> Self {
        Self {
            game_path: game_path.into(),
            game_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("resource error: {0}")]
    ResourcesError(#[from] ResourcesError),

    #[error("no modules directory in {}", .0.display())]
    ModulesDirectoryNotFound(PathBuf),

    #[error("module {name} not found in {}", .directory.display())]
    ModuleNotFound { name: String, directory: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode talk table {}: {source}", .path.display())]
    TalkTableError {
        path: PathBuf,
        #[source]
        source: TalkTableError,
    },
}

#[derive(Clone, Copy, Debug)]
enum ArchiveKind {
    Key,
    Erf,
    Rim,
    Folder,
    RecursiveFolder,
    Exe,
}

/// Owns the provider chain of one game install and the caches decoded from it.
///
/// [`init`](Self::init) mounts the global archives once. [`on_module_load`](Self::on_module_load)
/// then replaces the module-scoped archives whenever the player changes area.
pub struct ResourceDirector {
    options: DirectorOptions,
    resources: Resources,
    gffs: Gffs,
    two_das: TwoDas,
    talk_tables: TalkTables,
    letter_tables: LetterTables,
    talk_table: Option<Arc<TalkTable>>,
}

impl ResourceDirector {
    pub fn new(options: DirectorOptions) -> Self {
        Self {
            options,
            resources: Resources::new(),
            gffs: Gffs::new(),
            two_das: TwoDas::default(),
            talk_tables: TalkTables::default(),
            letter_tables: LetterTables::default(),
            talk_table: None,
        }
    }

    pub fn options(&self) -> &DirectorOptions {
        &self.options
    }

    /// Mounts the global archives of the install, lowest priority first, and loads `dialog.tlk`.
    /// Archives missing from the install are skipped.
    pub fn init(&mut self) -> Result<(), DirectorError> {
        let game_path = self.options.game_path.clone();
        let game_id = self.options.game_id;

        self.mount_optional(&game_path, KEY_FILENAME, ArchiveKind::Key, false)?;
        if let Some(shader_pack) = self.options.shader_pack.clone() {
            if shader_pack.is_file() {
                self.resources.add_erf(&shader_pack, false)?;
            } else {
                debug!(path = %shader_pack.display(), "Skipping missing shader pack");
            }
        }
        if game_id == GameId::Kotor {
            self.mount_optional(&game_path, PATCH_FILENAME, ArchiveKind::Erf, false)?;
        }

        for pack in [TEXTURE_PACK_GUI, self.options.texture_quality.texture_pack()] {
            let name = format!("{TEXTURE_PACK_DIRECTORY}/{pack}");
            self.mount_optional(&game_path, &name, ArchiveKind::Erf, false)?;
        }

        let voice = match game_id {
            GameId::Kotor => WAVES_DIRECTORY,
            GameId::Tsl => VOICE_DIRECTORY,
        };
        for directory in [MUSIC_DIRECTORY, SOUNDS_DIRECTORY, voice] {
            self.mount_optional(&game_path, directory, ArchiveKind::RecursiveFolder, false)?;
        }

        let lips: &[&str] = match game_id {
            GameId::Kotor => &["global.mod", "localization.mod"],
            GameId::Tsl => &["localization.mod"],
        };
        for lip in lips {
            let name = format!("{LIPS_DIRECTORY}/{lip}");
            self.mount_optional(&game_path, &name, ArchiveKind::Erf, false)?;
        }

        self.mount_optional(&game_path, OVERRIDE_DIRECTORY, ArchiveKind::Folder, false)?;
        self.mount_optional(&game_path, game_id.executable(), ArchiveKind::Exe, false)?;

        self.talk_table = self.load_talk_table()?;

        info!(
            path = %game_path.display(),
            archives = self.resources.providers().len(),
            "Mounted global archives"
        );
        Ok(())
    }

    fn load_talk_table(&self) -> Result<Option<Arc<TalkTable>>, DirectorError> {
        let Some(path) = find_path_ignore_case(&self.options.game_path, TALK_TABLE_FILENAME) else {
            debug!(path = %self.options.game_path.display(), "No talk table in the install");
            return Ok(None);
        };
        let data = get_file_as_byte_vec(&path).map_err(|source| DirectorError::IoError {
            path: path.clone(),
            source,
        })?;
        let table = TalkTableReader::read(&data)
            .map_err(|source| DirectorError::TalkTableError { path, source })?;
        Ok(Some(Arc::new(table)))
    }

    /// Drops the archives and decoded trees of the previous module and mounts the archives of
    /// `name`. Fails when the modules directory holds no archive for `name`.
    pub fn on_module_load(&mut self, name: &str) -> Result<(), DirectorError> {
        let name = name.to_ascii_lowercase();
        self.gffs.clear();
        self.resources.clear_local();

        let result = self.mount_module(&name);
        if result.is_err() {
            self.resources.clear_local();
        }
        result
    }

    fn mount_module(&mut self, name: &str) -> Result<(), DirectorError> {
        let game_path = self.options.game_path.clone();
        let modules = self.modules_directory()?;

        let mut mounted = 0;
        for (file, kind) in [
            (format!("{name}.rim"), ArchiveKind::Rim),
            (format!("{name}_s.rim"), ArchiveKind::Rim),
            (format!("{name}.mod"), ArchiveKind::Erf),
        ] {
            if self.mount_optional(&modules, &file, kind, true)? {
                mounted += 1;
            }
        }

        let lips = format!("{LIPS_DIRECTORY}/{name}_loc.mod");
        self.mount_optional(&game_path, &lips, ArchiveKind::Erf, true)?;

        if self.options.game_id == GameId::Tsl {
            let dialog = format!("{name}_dlg.erf");
            if self.mount_optional(&modules, &dialog, ArchiveKind::Erf, true)? {
                mounted += 1;
            }
        }

        if mounted == 0 {
            return Err(DirectorError::ModuleNotFound {
                name: name.to_string(),
                directory: modules,
            });
        }
        info!(module = %name, archives = mounted, "Loaded module archives");
        Ok(())
    }

    /// Names of the modules of the install: every `*.mod` and `*.rim` in the modules directory
    /// except the `*_s.rim` companions, lower-cased and without extension.
    pub fn module_names(&self) -> Result<BTreeSet<String>, DirectorError> {
        let modules = self.modules_directory()?;
        let files = read_file_paths(&modules, false).map_err(|source| DirectorError::IoError {
            path: modules.clone(),
            source,
        })?;

        Ok(files
            .iter()
            .filter_map(|path| path.file_name()?.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|file| file.ends_with(".mod") || (file.ends_with(".rim") && !file.ends_with("_s.rim")))
            .map(|file| file[..file.len() - 4].to_string())
            .collect())
    }

    fn modules_directory(&self) -> Result<PathBuf, DirectorError> {
        find_path_ignore_case(&self.options.game_path, MODULES_DIRECTORY)
            .ok_or_else(|| DirectorError::ModulesDirectoryNotFound(self.options.game_path.clone()))
    }

    /// Mounts `name` below `directory` when it exists. Returns whether anything was mounted.
    fn mount_optional(
        &mut self,
        directory: &Path,
        name: &str,
        kind: ArchiveKind,
        local: bool,
    ) -> Result<bool, DirectorError> {
        let Some(path) = find_path_ignore_case(directory, name) else {
            debug!(directory = %directory.display(), name, "Skipping missing archive");
            return Ok(false);
        };

        match kind {
            ArchiveKind::Key => self.resources.add_key(&path, local)?,
            ArchiveKind::Erf => self.resources.add_erf(&path, local)?,
            ArchiveKind::Rim => self.resources.add_rim(&path, local)?,
            ArchiveKind::Folder => self.resources.add_folder(&path, local)?,
            ArchiveKind::RecursiveFolder => self.resources.add_folder_recursive(&path, local)?,
            ArchiveKind::Exe => self.resources.add_exe(&path, local)?,
        };
        Ok(true)
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    pub fn gffs(&self) -> &Gffs {
        &self.gffs
    }

    pub fn two_das(&self) -> &TwoDas {
        &self.two_das
    }

    pub fn talk_tables(&self) -> &TalkTables {
        &self.talk_tables
    }

    pub fn letter_tables(&self) -> &LetterTables {
        &self.letter_tables
    }

    pub fn get_gff(&self, name: &str, kind: ResourceType) -> Result<Option<Arc<Gff>>, ResourcesError> {
        self.gffs.get(&self.resources, name, kind)
    }

    pub fn get_2da(&self, name: &str) -> Result<Option<Arc<TwoDa>>, ResourcesError> {
        self.two_das.get(&self.resources, name)
    }

    /// `dialog.tlk` of the install, when [`init`](Self::init) found one.
    pub fn talk_table(&self) -> Option<&TalkTable> {
        self.talk_table.as_deref()
    }

    /// Text of `str_ref` in `dialog.tlk`, empty for `-1`, unknown references or a missing table.
    /// Developer notes in braces are removed from TSL strings.
    pub fn get_string(&self, str_ref: i32) -> String {
        let Some(table) = self.talk_table() else {
            return String::new();
        };
        let text = table.get_text(str_ref);
        match self.options.game_id {
            GameId::Kotor => text.to_string(),
            GameId::Tsl => strip_developer_notes(text),
        }
    }
}

fn strip_developer_notes(text: &str) -> String {
    let mut text = text.to_string();
    while let Some(open) = text.find('{') {
        let Some(close) = text[open..].find('}') else {
            break;
        };
        text.replace_range(open..=open + close, "");
    }
    text
}
