use std::collections::HashMap;

use crate::asset::{AssetObject, ObjectData, PathId};

/// Maps the objects of one bundle to the container path they are known by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerIndex {
    paths: HashMap<PathId, String>,
}

impl ContainerIndex {
    /// Builds the index from the objects of a single bundle.
    ///
    /// Every container entry of an asset bundle object covers a range of its
    /// preload table, all objects in that range get the entry's path.
    /// Resource manager entries are applied afterwards and override those.
    pub fn build<'a>(objects: impl IntoIterator<Item = &'a AssetObject> + Clone) -> Self {
        let mut paths = HashMap::new();

        for object in objects.clone() {
            let ObjectData::AssetBundle {
                preload_table,
                container,
            } = &object.data
            else {
                continue;
            };
            for (path, info) in container {
                let end = info.preload_index.saturating_add(info.preload_size);
                let range = preload_table
                    .get(info.preload_index..end.min(preload_table.len()))
                    .unwrap_or_default();
                for path_id in range {
                    paths.insert(*path_id, path.clone());
                }
            }
        }

        for object in objects {
            if let ObjectData::ResourceManager { container } = &object.data {
                for (path, path_id) in container {
                    paths.insert(*path_id, path.clone());
                }
            }
        }

        Self { paths }
    }

    pub fn get(&self, path_id: PathId) -> Option<&str> {
        self.paths.get(&path_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetInfo;

    fn object(path_id: PathId, data: ObjectData) -> AssetObject {
        AssetObject {
            path_id,
            name: String::new(),
            data,
        }
    }

    #[test]
    fn test_preload_ranges() {
        let bundle = object(
            1,
            ObjectData::AssetBundle {
                preload_table: vec![10, 11, 12, 20],
                container: vec![
                    (
                        "assets/arts/a.png".to_string(),
                        AssetInfo {
                            preload_index: 0,
                            preload_size: 3,
                        },
                    ),
                    (
                        "assets/arts/b.png".to_string(),
                        AssetInfo {
                            preload_index: 3,
                            preload_size: 1,
                        },
                    ),
                ],
            },
        );

        let index = ContainerIndex::build([&bundle]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.get(11), Some("assets/arts/a.png"));
        assert_eq!(index.get(20), Some("assets/arts/b.png"));
        assert_eq!(index.get(1), None);
    }

    #[test]
    fn test_resource_manager_takes_precedence() {
        // The resource manager comes first in the object list, it still wins.
        let manager = object(
            2,
            ObjectData::ResourceManager {
                container: vec![("resources/override.txt".to_string(), 10)],
            },
        );
        let bundle = object(
            1,
            ObjectData::AssetBundle {
                preload_table: vec![10, 11],
                container: vec![(
                    "assets/from_bundle.txt".to_string(),
                    AssetInfo {
                        preload_index: 0,
                        preload_size: 2,
                    },
                )],
            },
        );

        let index = ContainerIndex::build([&manager, &bundle]);
        assert_eq!(index.get(10), Some("resources/override.txt"));
        assert_eq!(index.get(11), Some("assets/from_bundle.txt"));
    }

    #[test]
    fn test_out_of_range_entry_is_clamped() {
        let bundle = object(
            1,
            ObjectData::AssetBundle {
                preload_table: vec![5],
                container: vec![(
                    "assets/x.png".to_string(),
                    AssetInfo {
                        preload_index: 0,
                        preload_size: 10,
                    },
                )],
            },
        );
        let index = ContainerIndex::build([&bundle]);
        assert_eq!(index.get(5), Some("assets/x.png"));

        let empty = ContainerIndex::build(std::iter::empty());
        assert!(empty.is_empty());
    }
}
