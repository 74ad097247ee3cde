//! Loaded compiled sources: one database or several keyed by file name

use crate::network::{dbc, strip_extension, DatabaseStats, Message, NetworkDatabase};
use crate::types::{MatrixError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// The set of network databases currently loaded
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Exactly one file was loaded
    Single(NetworkDatabase),
    /// Several files, keyed by source name; repeated names get a `#N` suffix
    Multiple(BTreeMap<String, NetworkDatabase>),
}

impl Source {
    /// Load one or more DBC files
    ///
    /// A single path must parse. With several paths, files that fail are
    /// skipped with a warning; it is an error only if none could be loaded.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        match paths {
            [] => Err(MatrixError::NoSources),
            [path] => Ok(Source::Single(dbc::load_dbc_file(path.as_ref())?)),
            _ => {
                let mut databases = BTreeMap::new();
                for path in paths {
                    match dbc::load_dbc_file(path.as_ref()) {
                        Ok(db) => insert_unique(&mut databases, db),
                        Err(e) => {
                            log::warn!("Skipping {:?}: {}", path.as_ref(), e);
                        }
                    }
                }
                if databases.is_empty() {
                    return Err(MatrixError::NoSources);
                }
                Ok(Source::Multiple(databases))
            }
        }
    }

    /// Build a source from already-parsed databases
    ///
    /// One database becomes `Single`; more become `Multiple` keyed by name.
    pub fn from_databases(databases: Vec<NetworkDatabase>) -> Result<Self> {
        let mut databases = databases;
        match databases.len() {
            0 => Err(MatrixError::NoSources),
            1 => Ok(Source::Single(databases.remove(0))),
            _ => {
                let mut map = BTreeMap::new();
                for db in databases {
                    insert_unique(&mut map, db);
                }
                Ok(Source::Multiple(map))
            }
        }
    }

    /// Iterate over `(source name, database)` pairs in a stable order
    pub fn databases(&self) -> Box<dyn Iterator<Item = (&str, &NetworkDatabase)> + '_> {
        match self {
            Source::Single(db) => Box::new(std::iter::once((db.name.as_str(), db))),
            Source::Multiple(map) => Box::new(map.iter().map(|(k, v)| (k.as_str(), v))),
        }
    }

    /// Number of loaded databases
    pub fn len(&self) -> usize {
        match self {
            Source::Single(_) => 1,
            Source::Multiple(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a message to every loaded database
    ///
    /// Takes `&mut self`, so no reader can observe a partially appended set.
    pub fn append_message(&mut self, message: Message) {
        match self {
            Source::Single(db) => db.append_message(message),
            Source::Multiple(map) => {
                for db in map.values_mut() {
                    db.append_message(message.clone());
                }
            }
        }
    }

    /// Statistics summed over all databases
    pub fn stats(&self) -> DatabaseStats {
        self.databases()
            .map(|(_, db)| db.stats())
            .fold(DatabaseStats::default(), |acc, s| acc + s)
    }
}

/// Insert under the database name, suffixing repeated names (`body#2.dbc`)
fn insert_unique(map: &mut BTreeMap<String, NetworkDatabase>, db: NetworkDatabase) {
    let mut key = db.name.clone();
    if map.contains_key(&key) {
        let stem = strip_extension(&db.name);
        let extension = &db.name[stem.len()..];
        let mut n = 2;
        while map.contains_key(&key) {
            key = format!("{}#{}{}", stem, n, extension);
            n += 1;
        }
        log::warn!("Source name {:?} is already loaded; keeping it as {:?}", db.name, key);
    }
    map.insert(key, db);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_databases_picks_variant() {
        let single = Source::from_databases(vec![NetworkDatabase::new("a.dbc")]).unwrap();
        assert!(matches!(single, Source::Single(_)));

        let multiple = Source::from_databases(vec![
            NetworkDatabase::new("b.dbc"),
            NetworkDatabase::new("a.dbc"),
        ])
        .unwrap();
        assert_eq!(multiple.len(), 2);
        let names: Vec<_> = multiple.databases().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.dbc", "b.dbc"]);

        assert!(matches!(
            Source::from_databases(Vec::new()),
            Err(MatrixError::NoSources)
        ));
    }

    #[test]
    fn test_append_reaches_every_database() {
        let mut source = Source::from_databases(vec![
            NetworkDatabase::new("a.dbc"),
            NetworkDatabase::new("b.dbc"),
        ])
        .unwrap();

        source.append_message(Message::new("New_Msg", 0x10, 8));

        for (_, db) in source.databases() {
            assert_eq!(db.messages.len(), 1);
            assert_eq!(db.messages[0].name, "New_Msg");
        }
        assert_eq!(source.stats().num_messages, 2);
    }

    #[test]
    fn test_load_without_paths_fails() {
        let paths: Vec<&Path> = Vec::new();
        assert!(matches!(Source::load(&paths), Err(MatrixError::NoSources)));
    }

    #[test]
    fn test_load_skips_unreadable_files_in_multi_mode() {
        let paths = [
            Path::new("/nonexistent/one.dbc"),
            Path::new("/nonexistent/two.dbc"),
        ];
        assert!(matches!(Source::load(&paths), Err(MatrixError::NoSources)));
    }

    #[test]
    fn test_repeated_names_are_kept_apart() {
        let mut body = NetworkDatabase::new("body.dbc");
        body.append_message(Message::new("Door_Status", 0x100, 8));
        let mut other = NetworkDatabase::new("body.dbc");
        other.append_message(Message::new("Speed_Status", 0x200, 8));

        let source = Source::from_databases(vec![body, other]).unwrap();
        assert_eq!(source.len(), 2);
        let names: Vec<_> = source.databases().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["body#2.dbc", "body.dbc"]);
        assert_eq!(source.stats().num_messages, 2);
    }

    #[test]
    fn test_load_same_file_name_from_two_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (folder, message) in [("a", "Door_Status"), ("b", "Brake_Status")] {
            let folder = dir.path().join(folder);
            std::fs::create_dir(&folder).unwrap();
            let path = folder.join("body.dbc");
            std::fs::write(&path, dbc_with_message(message)).unwrap();
            paths.push(path);
        }

        let source = Source::load(paths.as_slice()).unwrap();
        assert_eq!(source.len(), 2);

        let messages: Vec<_> = source
            .databases()
            .flat_map(|(_, db)| db.messages.iter().map(|m| m.name.as_str()))
            .collect();
        assert!(messages.contains(&"Door_Status"));
        assert!(messages.contains(&"Brake_Status"));
    }

    fn dbc_with_message(name: &str) -> String {
        format!(
            r#"
VERSION ""

NS_ :
    CM_
    BA_DEF_
    BA_
    VAL_
    BA_DEF_DEF_

BS_:

BU_: BCM GW

BO_ 256 {}: 8 BCM
 SG_ Value : 0|8@1+ (1,0) [0|255] "" GW

"#,
            name
        )
    }
}
