//! Resource kinds and their numeric ids and file extensions.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Declares [`ResourceType`] together with its numeric id and extension tables.
macro_rules! define_resource_types {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident = $id:literal => $ext:literal
        ),+ $(,)?
    ) => {
        /// Enumerated resource category. The category determines the conventional file extension
        /// and the numeric id stored in archive tables.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[repr(u16)]
        pub enum ResourceType {
            $(
                $(#[$meta])*
                $variant = $id,
            )+
        }

        impl ResourceType {
            /// Every known resource type, in id order.
            pub const ALL: &'static [ResourceType] = &[$(ResourceType::$variant),+];

            pub fn id(&self) -> u16 {
                *self as u16
            }

            pub fn from_id(id: u16) -> Option<Self> {
                match id {
                    $($id => Some(ResourceType::$variant),)+
                    _ => None,
                }
            }

            pub fn extension(&self) -> &'static str {
                match self {
                    $(ResourceType::$variant => $ext,)+
                }
            }

            /// Matches `extension` against the extension table, ignoring ASCII case.
            pub fn from_extension(extension: &str) -> Option<Self> {
                let extension = extension.to_ascii_lowercase();
                match extension.as_str() {
                    $($ext => Some(ResourceType::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

define_resource_types! {
    Res = 0 => "res",
    Bmp = 1 => "bmp",
    Tga = 3 => "tga",
    Wav = 4 => "wav",
    Plt = 6 => "plt",
    Ini = 7 => "ini",
    Mp3 = 8 => "mp3",
    Txt = 10 => "txt",
    Mdl = 2002 => "mdl",
    Nss = 2009 => "nss",
    Ncs = 2010 => "ncs",
    Mod = 2011 => "mod",
    Are = 2012 => "are",
    Set = 2013 => "set",
    Ifo = 2014 => "ifo",
    Bic = 2015 => "bic",
    Wok = 2016 => "wok",
    TwoDa = 2017 => "2da",
    Tlk = 2018 => "tlk",
    Txi = 2022 => "txi",
    Git = 2023 => "git",
    Bti = 2024 => "bti",
    Uti = 2025 => "uti",
    Btc = 2026 => "btc",
    Utc = 2027 => "utc",
    Dlg = 2029 => "dlg",
    Itp = 2030 => "itp",
    Btt = 2031 => "btt",
    Utt = 2032 => "utt",
    Dds = 2033 => "dds",
    Bts = 2034 => "bts",
    Uts = 2035 => "uts",
    Ltr = 2036 => "ltr",
    Gff = 2037 => "gff",
    Fac = 2038 => "fac",
    Bte = 2039 => "bte",
    Ute = 2040 => "ute",
    Btd = 2041 => "btd",
    Utd = 2042 => "utd",
    Btp = 2043 => "btp",
    Utp = 2044 => "utp",
    Dft = 2045 => "dft",
    Gic = 2046 => "gic",
    Gui = 2047 => "gui",
    Css = 2048 => "css",
    Ccs = 2049 => "ccs",
    Btm = 2050 => "btm",
    Utm = 2051 => "utm",
    Dwk = 2052 => "dwk",
    Pwk = 2053 => "pwk",
    Btg = 2054 => "btg",
    Utg = 2055 => "utg",
    Jrl = 2056 => "jrl",
    Sav = 2057 => "sav",
    Utw = 2058 => "utw",
    Ssf = 2060 => "ssf",
    Hak = 2061 => "hak",
    Nwm = 2062 => "nwm",
    Bik = 2063 => "bik",
    Ndb = 2064 => "ndb",
    Ptm = 2065 => "ptm",
    Ptt = 2066 => "ptt",
    Lyt = 3000 => "lyt",
    Vis = 3001 => "vis",
    Rim = 3002 => "rim",
    Pth = 3003 => "pth",
    Lip = 3004 => "lip",
    Bwm = 3005 => "bwm",
    Txb = 3006 => "txb",
    Tpc = 3007 => "tpc",
    Mdx = 3008 => "mdx",
    Rsv = 3009 => "rsv",
    Sig = 3010 => "sig",
    Xbx = 3011 => "xbx",
    Erf = 9997 => "erf",
    Bif = 9998 => "bif",
    Key = 9999 => "key",
    /// Cursor image embedded in the game executable. Never stored in archive tables.
    Cursor = 0xfff0 => "cur",
    /// Cursor group embedded in the game executable. Never stored in archive tables.
    CursorGroup = 0xfff1 => "curs",
}

impl ResourceType {
    /// Whether resources of this kind are stored as GFF trees.
    pub fn is_gff(&self) -> bool {
        self.gff_signature().is_some()
    }

    /// The four character GFF file type written at the start of a GFF of this kind.
    pub fn gff_signature(&self) -> Option<&'static [u8; 4]> {
        Some(match self {
            ResourceType::Res => b"RES ",
            ResourceType::Are => b"ARE ",
            ResourceType::Ifo => b"IFO ",
            ResourceType::Bic => b"BIC ",
            ResourceType::Git => b"GIT ",
            ResourceType::Uti => b"UTI ",
            ResourceType::Utc => b"UTC ",
            ResourceType::Dlg => b"DLG ",
            ResourceType::Itp => b"ITP ",
            ResourceType::Utt => b"UTT ",
            ResourceType::Uts => b"UTS ",
            ResourceType::Gff => b"GFF ",
            ResourceType::Fac => b"FAC ",
            ResourceType::Ute => b"UTE ",
            ResourceType::Utd => b"UTD ",
            ResourceType::Utp => b"UTP ",
            ResourceType::Gic => b"GIC ",
            ResourceType::Gui => b"GUI ",
            ResourceType::Utm => b"UTM ",
            ResourceType::Jrl => b"JRL ",
            ResourceType::Utw => b"UTW ",
            ResourceType::Pth => b"PTH ",
            _ => return None,
        })
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}
