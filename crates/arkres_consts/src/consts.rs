use console::Style;
use std::sync::LazyLock;

pub const CONFIG_FILE: &str = "arkres.toml";

pub const DEFAULT_DATA_ROOT: &str = "Data";
pub const DEFAULT_PLATFORM: &str = "IOS";
pub const DEFAULT_UNITY_VERSION: &str = "2017.4.39f1";
pub const DEFAULT_USER_AGENT: &str = "Arknights/14 CFNetwork/1240.0.4 Darwin/20.6.0";
pub const DEFAULT_WORKERS: usize = 8;

/// The servers processed when the configuration does not name any.
pub const DEFAULT_SERVERS: &[&str] = &["cn", "us", "jp"];

/// Asset hosts of the servers known out of the box.
pub const SERVER_HOSTS: &[(&str, &str)] = &[
    ("cn", "ak.hycdn.cn"),
    ("us", "ark-us-static-online.yo-star.com"),
    ("jp", "ark-jp-static-online.yo-star.com"),
];

/// The `cn` server publishes its resource version on a separate config host.
pub const CN_SERVER: &str = "cn";
pub const CN_VERSION_HOST: &str = "ak-conf.hypergryph.com";

// Data root layout.
pub const RAW_DIR: &str = "raw";
pub const BUNDLES_DIR: &str = "bundles";
pub const ASSETS_DIR: &str = "assets";
pub const HOT_UPDATE_LIST: &str = "hot_update_list.json";

// Extensions.
pub const BUNDLE_EXTENSION: &str = "ab";
pub const IMAGE_EXTENSION: &str = ".png";
pub const BINARY_DATA_EXTENSION: &str = ".bytes";
pub const WAV_EXTENSION: &str = ".wav";
pub const JSON_EXTENSION: &str = ".json";
pub const TEXT_EXTENSION: &str = ".txt";

/// Upstream extensions that the asset host serves under a generic data extension.
pub const REQUEST_EXTENSION_PLACEHOLDERS: &[(&str, &str)] = &[(".ab", ".dat"), (".mp4", ".dat")];

// Game data conventions.
pub const GAMEDATA_ROOT: &str = "gamedata";
pub const STORY_DIR: &str = "story";
pub const EXCEL_DIR: &str = "excel";
pub const DATA_VERSION_NAME: &str = "data_version";

/// Gamedata subdirectories whose encrypted payloads start after a signature block.
const GAMEDATA_DECRYPT_OFFSETS: &[(&str, usize)] = &[
    ("[uc]lua.ab", 128),
    ("excel", 128),
    ("battle", 128),
    ("buff_table", 128),
];

/// Returns the decrypt offset for a top-level gamedata subdirectory, `0` for unknown ones.
pub fn gamedata_decrypt_offset(dir: &str) -> usize {
    GAMEDATA_DECRYPT_OFFSETS
        .iter()
        .find(|(name, _)| *name == dir)
        .map(|(_, offset)| *offset)
        .unwrap_or(0)
}

/// Returns the built-in asset host of a server.
pub fn builtin_server_host(server: &str) -> Option<&'static str> {
    SERVER_HOSTS
        .iter()
        .find(|(name, _)| *name == server)
        .map(|(_, host)| *host)
}

pub const CLAP_CONFIG_OPTIONS: &str = "Config Options";
pub const CLAP_GLOBAL_OPTIONS: &str = "Global Options";

pub static SERVER_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().cyan().bold());
pub static VERSION_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().yellow());
pub static STAGE_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().magenta());
