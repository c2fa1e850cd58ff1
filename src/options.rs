//! 宿主键值选项存储。
//!
//! 读取走 ArcSwap 快照，无锁；写入时复制一份新快照，先落盘再替换。

use anyhow::Context;
use arc_swap::ArcSwap;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 键值选项存储接口。
pub trait OptionStore: Send + Sync {
    fn get_option(&self, key: &str) -> Option<String>;

    /// 批量写入，全部成功或全部不生效。
    fn update_options<'a>(
        &'a self,
        updates: &'a [(&'a str, String)],
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// 以 `options.json` 持久化的选项存储。
#[derive(Debug)]
pub struct FileOptionStore {
    file_path: PathBuf,
    values: ArcSwap<HashMap<String, String>>,
    write_lock: Mutex<()>,
}

impl FileOptionStore {
    pub fn new(data_dir: &str) -> Self {
        Self {
            file_path: PathBuf::from(data_dir).join("options.json"),
            values: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> anyhow::Result<()> {
        let data = match tokio::fs::read(&self.file_path).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.values.store(Arc::new(HashMap::new()));
                return Ok(());
            }
            Err(e) => return Err(e).context("读取 options.json 失败"),
        };

        let values: HashMap<String, String> =
            sonic_rs::from_slice(&data).context("解析 options.json 失败")?;
        self.values.store(Arc::new(values));
        Ok(())
    }

    async fn write(&self, updates: &[(&str, String)]) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut next: HashMap<String, String> = (**self.values.load()).clone();
        for (key, value) in updates {
            next.insert((*key).to_string(), value.clone());
        }

        ensure_parent_dir(&self.file_path).await?;
        let data = sonic_rs::to_vec_pretty(&next).context("序列化 options.json 失败")?;
        tokio::fs::write(&self.file_path, data)
            .await
            .context("写入 options.json 失败")?;

        self.values.store(Arc::new(next));
        Ok(())
    }
}

impl OptionStore for FileOptionStore {
    fn get_option(&self, key: &str) -> Option<String> {
        self.values.load().get(key).cloned()
    }

    fn update_options<'a>(
        &'a self,
        updates: &'a [(&'a str, String)],
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        self.write(updates).boxed()
    }
}

async fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    tokio::fs::create_dir_all(dir)
        .await
        .context("创建数据目录失败")
}

#[cfg(test)]
pub use memory::MemoryOptionStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::sync::RwLock;

    #[derive(Debug, Default)]
    pub struct MemoryOptionStore {
        values: RwLock<HashMap<String, String>>,
    }

    impl MemoryOptionStore {
        pub fn with(pairs: &[(&str, &str)]) -> Self {
            let values = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            Self {
                values: RwLock::new(values),
            }
        }
    }

    impl OptionStore for MemoryOptionStore {
        fn get_option(&self, key: &str) -> Option<String> {
            self.values.read().unwrap().get(key).cloned()
        }

        fn update_options<'a>(
            &'a self,
            updates: &'a [(&'a str, String)],
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            let mut values = self.values.write().unwrap();
            for (key, value) in updates {
                values.insert((*key).to_string(), value.clone());
            }
            futures::future::ready(Ok(())).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileOptionStore::new(dir.path().to_str().unwrap());
        store.load().await.unwrap();
        assert_eq!(store.get_option("hello_homer_show_image"), None);
    }

    #[tokio::test]
    async fn update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested");
        let store = FileOptionStore::new(data_dir.to_str().unwrap());

        store
            .update_options(&[
                ("hello_homer_show_image", "no".to_string()),
                ("hello_homer_cache_time", "86400".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.get_option("hello_homer_show_image").as_deref(),
            Some("no")
        );
        assert!(data_dir.join("options.json").is_file());

        let reopened = FileOptionStore::new(data_dir.to_str().unwrap());
        reopened.load().await.unwrap();
        assert_eq!(
            reopened.get_option("hello_homer_cache_time").as_deref(),
            Some("86400")
        );
    }

    #[tokio::test]
    async fn load_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("options.json"), b"{not json").unwrap();
        let store = FileOptionStore::new(dir.path().to_str().unwrap());
        assert!(store.load().await.is_err());
    }
}
