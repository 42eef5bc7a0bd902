//! The built-in handlers, one per extracted object kind.

use std::path::Path;

use arkres_consts::consts;
use fs_err as fs;
use parking_lot::Mutex;

use super::{
    naming::split_extension,
    registry::{ExtractOptions, HandlingContext, output_path},
};
use crate::{
    SyncError,
    asset::{AssetObject, ObjectData},
    protocol,
};

/// The audio converter is not reentrant.
static AUDIO_CONVERSION: Mutex<()> = Mutex::new(());

fn write_output(context: &HandlingContext<'_>, path: &Path, data: &[u8]) -> Result<(), SyncError> {
    fs::create_dir_all(&context.directory)?;
    fs::write(path, data)?;
    filetime::set_file_mtime(path, context.bundle_time)?;
    Ok(())
}

fn write_image(
    object: &AssetObject,
    context: &HandlingContext<'_>,
    options: &ExtractOptions,
) -> Result<(), SyncError> {
    let path = options.output_path(&context.directory, &object.name, consts::IMAGE_EXTENSION);
    match context.backend.images.encode_png(object) {
        Some(png) => write_output(context, &path, &png),
        None => {
            tracing::warn!("Failed to export: {}", path.display());
            Ok(())
        }
    }
}

pub fn texture(
    object: &AssetObject,
    context: &HandlingContext<'_>,
    options: &ExtractOptions,
) -> Result<(), SyncError> {
    write_image(object, context, options)
}

pub fn sprite(
    object: &AssetObject,
    context: &HandlingContext<'_>,
    options: &ExtractOptions,
) -> Result<(), SyncError> {
    write_image(object, context, options)
}

pub fn audio_clip(
    object: &AssetObject,
    context: &HandlingContext<'_>,
    options: &ExtractOptions,
) -> Result<(), SyncError> {
    let ObjectData::AudioClip { audio_data } = &object.data else {
        return Ok(());
    };
    let audio = &context.backend.audio;

    let convert = context.convert_audio && audio.is_supported(object);
    let extension = if convert {
        consts::WAV_EXTENSION.to_string()
    } else {
        audio.native_extension(object)
    };
    let path = options.output_path(&context.directory, &object.name, &extension);

    let data = if convert {
        let _guard = AUDIO_CONVERSION.lock();
        audio.to_wav(object)
    } else {
        Some(audio_data.clone()).filter(|data| !data.is_empty())
    };

    match data {
        Some(data) => write_output(context, &path, &data),
        None => {
            tracing::warn!("Failed to export: {}", path.display());
            Ok(())
        }
    }
}

/// A BSON document starts with its own length as a little endian `u32`.
fn looks_like_bson(data: &[u8]) -> bool {
    match data.first_chunk::<4>() {
        Some(prefix) => u32::from_le_bytes(*prefix) as usize == data.len(),
        None => false,
    }
}

fn bson_to_json(data: &[u8]) -> Result<Vec<u8>, String> {
    let document = bson::Document::from_reader(data).map_err(|e| e.to_string())?;
    let json = bson::Bson::Document(document).into_relaxed_extjson();
    serde_json::to_vec_pretty(&json).map_err(|e| e.to_string())
}

pub fn text_asset(
    object: &AssetObject,
    context: &HandlingContext<'_>,
    options: &ExtractOptions,
) -> Result<(), SyncError> {
    let ObjectData::TextAsset { script } = &object.data else {
        return Ok(());
    };
    let is_gamedata = context.is_gamedata();
    let gamedata_dir = context.gamedata_dir();

    let (declared_name, declared_extension) = split_extension(&object.name);
    let name = options.name.as_deref().unwrap_or(declared_name);
    let mut extension = options
        .extension
        .as_deref()
        .unwrap_or(declared_extension)
        .to_string();
    if extension.is_empty() {
        extension = if is_gamedata && gamedata_dir != consts::STORY_DIR {
            consts::JSON_EXTENSION.to_string()
        } else {
            consts::TEXT_EXTENSION.to_string()
        };
    }

    let mut data = script.clone();
    if let Some(keys) = context.decrypt {
        if is_gamedata && extension == consts::BINARY_DATA_EXTENSION {
            let offset = consts::gamedata_decrypt_offset(gamedata_dir);
            let label = format!("{}/{}", context.bundle_path, object.name);
            data = protocol::decrypt_or_original(&keys.key, &keys.iv_mask, data, offset, &label);
        }
    }

    let is_data_version = object.name == consts::DATA_VERSION_NAME;
    if is_gamedata && !is_data_version && looks_like_bson(&data) {
        tracing::info!("Treat {name} as BSON");
        match bson_to_json(&data) {
            Ok(json) => {
                data = json;
                extension = consts::JSON_EXTENSION.to_string();
            }
            Err(e) => tracing::warn!("Keeping {name} as is, it is not a valid BSON document: {e}"),
        }
    }

    if is_data_version && gamedata_dir == consts::EXCEL_DIR {
        extension.clear();
    }

    let path = output_path(&context.directory, name, &extension);
    write_output(context, &path, &data)
}
