use std::collections::HashMap;

use arkres_consts::consts;
use itertools::Itertools;

use super::{container::ContainerIndex, registry::ExtractOptions};
use crate::asset::{AssetObject, PathId};

/// Splits a file name into stem and extension, the extension keeps its dot.
/// A trailing dot does not start an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() && !name[idx..].contains(['/', '\\']) => {
            name.split_at(idx)
        }
        _ => (name, ""),
    }
}

/// The last component of a `/` separated container path.
fn file_name(container_path: &str) -> &str {
    container_path
        .rsplit_once('/')
        .map_or(container_path, |(_, name)| name)
}

/// Resolves the output names of the images of one bundle.
///
/// An image whose container entry is a `.png` file is named after that file,
/// any other falls back to its own name. When several images end up with the
/// same name, every one of them gets its path id appended.
pub fn visual_names<'a>(
    objects: impl IntoIterator<Item = &'a AssetObject>,
    index: &ContainerIndex,
) -> Vec<(&'a AssetObject, String)> {
    let resolved = objects
        .into_iter()
        .map(|object| {
            let from_container = index.get(object.path_id).and_then(|path| {
                let (stem, extension) = split_extension(file_name(path));
                (extension == consts::IMAGE_EXTENSION).then_some(stem)
            });
            let name = from_container.unwrap_or(&object.name).to_string();
            (object, name)
        })
        .collect::<Vec<_>>();

    let occurrences: HashMap<&str, usize> = resolved.iter().map(|(_, name)| name.as_str()).counts();
    let collisions: Vec<bool> = resolved
        .iter()
        .map(|(_, name)| occurrences[name.as_str()] > 1)
        .collect();

    resolved
        .into_iter()
        .zip(collisions)
        .map(|((object, name), collides)| {
            if collides {
                let name = format!("{name} [{}]", object.path_id);
                (object, name)
            } else {
                (object, name)
            }
        })
        .collect()
}

/// The name and extension a text asset takes over from its container entry.
pub fn text_options(path_id: PathId, index: &ContainerIndex) -> ExtractOptions {
    match index.get(path_id) {
        Some(path) => {
            let (stem, extension) = split_extension(file_name(path));
            ExtractOptions {
                name: Some(stem.to_string()),
                extension: Some(extension.to_string()),
            }
        }
        None => ExtractOptions::default(),
    }
}
