use super::*;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Stores every namespace as a JSON document `<dir>/<namespace>.json`.
///
/// Writes land in a temporary sibling first and are renamed over the old
/// document, which is atomic on the platforms we run on.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> error::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, namespace: &str) -> error::Result<Namespace> {
        let data = match fs::read(self.path_of(namespace)) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Namespace::default()),
            Err(err) => return Err(err.into()),
        };

        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, namespace: &str, values: &Namespace) -> error::Result<()> {
        let path = self.path_of(namespace);
        let tmp_path = self.dir.join(format!(".{namespace}.json.tmp"));

        let data = serde_json::to_vec_pretty(values)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &path)?;

        Ok(())
    }
}
