mod common;

use std::fs;
use std::path::{Path, PathBuf};

use aurora_rs::format::gff::{FieldValue, Gff};
use aurora_rs::format::gff_writer::GffWriter;
use aurora_rs::resource::director::{
    DirectorError, DirectorOptions, GameId, ResourceDirector, TextureQuality,
};
use aurora_rs::{ResourceId, ResourceType};
use common::{build_2da, build_bif, build_erf, build_key, build_rim};

fn module_info(entry_area: &str) -> Vec<u8> {
    let ifo = Gff::new(Gff::ROOT_STRUCT_TYPE)
        .with("Mod_Entry_Area", FieldValue::ResRef(entry_area.to_string()))
        .with("Mod_XPScale", FieldValue::Byte(10));
    GffWriter::write(&ifo, ResourceType::Ifo).unwrap()
}

fn appearance(label: &str) -> Vec<u8> {
    build_2da(&["label", "modeltype"], &[&[label, "B"]])
}

/// Lays out a small K1 install: data files, a patch, texture packs, loose files and two modules.
fn write_install(root: &Path) -> std::io::Result<()> {
    for dir in ["data", "TexturePacks", "StreamWaves", "Override", "Modules", "lips"] {
        fs::create_dir(root.join(dir))?;
    }

    fs::write(
        root.join("data").join("2da.bif"),
        build_bif(&[
            (ResourceType::TwoDa, &appearance("base")),
            (ResourceType::TwoDa, &build_2da(&["name"], &[&["x"]])),
        ]),
    )?;
    fs::write(
        root.join("chitin.key"),
        build_key(
            &["data\\2da.bif"],
            &[
                ("appearance", ResourceType::TwoDa, 0, 0),
                ("portraits", ResourceType::TwoDa, 0, 1),
            ],
        ),
    )?;
    fs::write(
        root.join("patch.erf"),
        build_erf(b"ERF V1.0", &[("appearance", ResourceType::TwoDa, &appearance("patched"))]),
    )?;
    fs::write(
        root.join("TexturePacks").join("swpc_tex_tpa.erf"),
        build_erf(b"ERF V1.0", &[("lda_hi", ResourceType::Tpc, b"high")]),
    )?;
    fs::write(
        root.join("TexturePacks").join("swpc_tex_tpb.erf"),
        build_erf(b"ERF V1.0", &[("lda_med", ResourceType::Tpc, b"medium")]),
    )?;
    fs::write(root.join("StreamWaves").join("n_bastila_1.wav"), b"voice")?;

    let modules = root.join("Modules");
    fs::write(
        modules.join("danm13.rim"),
        build_rim(&[("module", ResourceType::Ifo, &module_info("m13aa"))]),
    )?;
    fs::write(
        modules.join("danm13_s.rim"),
        build_rim(&[("dan13_bastila", ResourceType::Dlg, b"DLG V3.2")]),
    )?;
    fs::write(
        modules.join("danm13.mod"),
        build_erf(b"MOD V1.0", &[("module", ResourceType::Ifo, &module_info("m13ab"))]),
    )?;
    fs::write(
        modules.join("ebo_m12aa.rim"),
        build_rim(&[("module", ResourceType::Ifo, &module_info("m12aa"))]),
    )?;
    fs::write(
        root.join("lips").join("danm13_loc.mod"),
        build_erf(b"MOD V1.0", &[("n_bastila_1", ResourceType::Lip, b"LIP V1.0")]),
    )?;
    Ok(())
}

fn director(root: &Path, game_id: GameId) -> ResourceDirector {
    let mut options = DirectorOptions::new(root, game_id);
    options.texture_quality = TextureQuality::Medium;
    ResourceDirector::new(options)
}

#[test]
fn test_global_archives() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempfile::tempdir()?;
    write_install(game.path())?;

    let mut director = director(game.path(), GameId::Kotor);
    director.init()?;
    assert_eq!(director.resources().providers().len(), 5);

    let table = director.get_2da("Appearance")?.ok_or("appearance.2da missing")?;
    assert_eq!(table.get_string(0, "label", ""), "patched");
    assert!(director.get_2da("portraits")?.is_some());

    fs::write(
        game.path().join("Override").join("appearance.2da"),
        appearance("override"),
    )?;
    assert_eq!(director.get_2da("appearance")?.map(|t| t.cell(0, 0).to_string()), Some("patched".into()));

    let resources = director.resources();
    assert!(resources
        .find(&ResourceId::new("lda_med", ResourceType::Tpc))?
        .is_some());
    assert!(resources
        .find(&ResourceId::new("lda_hi", ResourceType::Tpc))?
        .is_none());
    assert_eq!(
        resources
            .get(&ResourceId::new("n_bastila_1", ResourceType::Wav))?
            .as_slice(),
        b"voice"
    );
    Ok(())
}

#[test]
fn test_module_transition() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempfile::tempdir()?;
    write_install(game.path())?;

    let mut director = director(game.path(), GameId::Kotor);
    director.init()?;
    let global = director.resources().providers().len();

    let names: Vec<_> = director.module_names()?.into_iter().collect();
    assert_eq!(names, ["danm13", "ebo_m12aa"]);

    director.on_module_load("danm13")?;
    assert_eq!(director.resources().providers().len(), global + 4);
    let ifo = director.get_gff("module", ResourceType::Ifo)?.ok_or("module.ifo missing")?;
    assert_eq!(ifo.get_string("Mod_Entry_Area", ""), "m13ab");
    assert_eq!(ifo.get_int("Mod_XPScale", 0), 10);
    assert!(director
        .resources()
        .find(&ResourceId::new("n_bastila_1", ResourceType::Lip))?
        .is_some());

    director.get_2da("appearance")?;
    assert_eq!(director.gffs().len(), 1);
    assert_eq!(director.two_das().len(), 1);

    director.on_module_load("EBO_M12AA")?;
    assert_eq!(director.resources().providers().len(), global + 1);
    assert!(director.gffs().is_empty());
    assert_eq!(director.two_das().len(), 1);

    let ifo = director.get_gff("module", ResourceType::Ifo)?.ok_or("module.ifo missing")?;
    assert_eq!(ifo.get_string("Mod_Entry_Area", ""), "m12aa");
    assert!(director
        .resources()
        .find(&ResourceId::new("dan13_bastila", ResourceType::Dlg))?
        .is_none());
    Ok(())
}

#[test]
fn test_unknown_module() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempfile::tempdir()?;
    write_install(game.path())?;

    let mut director = director(game.path(), GameId::Kotor);
    director.init()?;
    director.on_module_load("danm13")?;

    let result = director.on_module_load("tar_m02aa");
    assert!(matches!(
        result,
        Err(DirectorError::ModuleNotFound { ref name, .. }) if name == "tar_m02aa"
    ));
    assert!(director.resources().providers().iter().all(|p| !p.is_local()));
    Ok(())
}

#[test]
fn test_lips_alone_do_not_load_a_module() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempfile::tempdir()?;
    write_install(game.path())?;
    fs::write(
        game.path().join("lips").join("ghost_loc.mod"),
        build_erf(b"MOD V1.0", &[("ghost_1", ResourceType::Lip, b"LIP V1.0")]),
    )?;

    let mut director = director(game.path(), GameId::Kotor);
    director.init()?;
    let global = director.resources().providers().len();

    assert!(matches!(
        director.on_module_load("ghost"),
        Err(DirectorError::ModuleNotFound { ref name, .. }) if name == "ghost"
    ));
    assert_eq!(director.resources().providers().len(), global);
    assert!(director
        .resources()
        .find(&ResourceId::new("ghost_1", ResourceType::Lip))?
        .is_none());
    Ok(())
}

#[test]
fn test_tsl_dialog_archive()-> Result<(), Box<dyn std::error::Error>> {
    let game = tempfile::tempdir()?;
    fs::create_dir(game.path().join("modules"))?;
    fs::write(
        game.path().join("modules").join("001ebo_dlg.erf"),
        build_erf(b"ERF V1.0", &[("kreia", ResourceType::Dlg, b"DLG V3.2")]),
    )?;

    let mut director = director(game.path(), GameId::Tsl);
    director.init()?;
    director.on_module_load("001ebo")?;
    assert!(director
        .resources()
        .find(&ResourceId::new("kreia", ResourceType::Dlg))?
        .is_some());

    let mut kotor = self::director(game.path(), GameId::Kotor);
    kotor.init()?;
    assert!(matches!(
        kotor.on_module_load("001ebo"),
        Err(DirectorError::ModuleNotFound { .. })
    ));
    Ok(())
}

/// Mounts a real install named by `KOTOR_PATH` and loads its first module.
#[test]
#[ignore]
fn test_real_install() -> Result<(), Box<dyn std::error::Error>> {
    let game_path = match std::env::var("KOTOR_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => return Err("KOTOR_PATH environment variable not set".into()),
    };

    let mut director = ResourceDirector::new(DirectorOptions::new(game_path, GameId::Kotor));
    director.init()?;
    assert!(!director.resources().providers().is_empty());
    assert!(director.get_2da("appearance")?.is_some());

    let module = director
        .module_names()?
        .into_iter()
        .next()
        .ok_or("no modules in the install")?;
    director.on_module_load(&module)?;
    assert!(director.get_gff("module", ResourceType::Ifo)?.is_some());
    assert!(!director.get_string(0).is_empty());
    Ok(())
}
