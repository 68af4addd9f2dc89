use crate::{TaskError, TaskResult};
use futures::{Stream, StreamExt};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Buffer size used when streaming downloads to disk
pub const CHUNK_SIZE: usize = 8 * 1024;

/// What happened when persisting content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The file was created
    Written,
    /// A file already existed at the target and was left untouched
    AlreadyExists,
}

/// Joins a plugin-supplied relative save path onto the download root
///
/// Absolute paths and `..` components would let a plugin write outside the
/// root, which is a contract violation.
pub fn resolve_save_path(root: &Path, save_path: &Path) -> TaskResult<PathBuf> {
    let escapes = save_path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if escapes || save_path.as_os_str().is_empty() {
        return Err(TaskError::Logic(format!(
            "Save path must be relative to the download root: {}",
            save_path.display()
        )));
    }

    Ok(root.join(save_path))
}

/// Creates the parent directories of `path` as needed
///
/// Fails with [`TaskError::PathConflict`] when one of the ancestors already
/// exists as a regular file.
pub async fn ensure_parent_dir(path: &Path) -> TaskResult<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    for ancestor in parent.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        match fs::metadata(ancestor).await {
            Ok(meta) if meta.is_dir() => break,
            Ok(_) => {
                return Err(TaskError::PathConflict {
                    path: ancestor.to_path_buf(),
                    existing: "file".to_string(),
                })
            }
            Err(_) => continue,
        }
    }

    fs::create_dir_all(parent)
        .await
        .map_err(|e| write_error(parent, &e))
}

/// Writes page content to `path` unless something already exists there
pub async fn write_page(path: &Path, content: &str) -> TaskResult<PersistOutcome> {
    if let Ok(meta) = fs::metadata(path).await {
        if meta.is_dir() {
            return Err(TaskError::PathConflict {
                path: path.to_path_buf(),
                existing: "directory".to_string(),
            });
        }
        return Ok(PersistOutcome::AlreadyExists);
    }

    ensure_parent_dir(path).await?;
    fs::write(path, content.as_bytes())
        .await
        .map_err(|e| create_error(path, &e))?;

    Ok(PersistOutcome::Written)
}

/// Streams a response body into a new file at `path`
///
/// Chunks are written through a fixed-size buffer, so memory use does not
/// depend on the size of the download. When `expected_len` is known the byte
/// count is checked once the stream ends. A partially written file is removed
/// on any failure, so a later run can fetch it again.
///
/// # Returns
///
/// The number of bytes written
pub async fn write_stream<S, B>(
    path: &Path,
    mut body: S,
    expected_len: Option<u64>,
) -> TaskResult<u64>
where
    S: Stream<Item = TaskResult<B>> + Unpin,
    B: AsRef<[u8]>,
{
    ensure_parent_dir(path).await?;

    let file = fs::File::create(path)
        .await
        .map_err(|e| create_error(path, &e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

    let result: TaskResult<u64> = async {
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let bytes = chunk.as_ref();
            if bytes.is_empty() {
                continue;
            }
            writer
                .write_all(bytes)
                .await
                .map_err(|e| write_error(path, &e))?;
            written += bytes.len() as u64;
        }
        writer.flush().await.map_err(|e| write_error(path, &e))?;

        if let Some(expected) = expected_len {
            if written != expected {
                return Err(TaskError::HttpRequest(format!(
                    "File size mismatch: expected {}, got {}",
                    expected, written
                )));
            }
        }
        Ok::<u64, TaskError>(written)
    }
    .await;

    if result.is_err() {
        drop(writer);
        if let Err(e) = fs::remove_file(path).await {
            tracing::warn!("Couldn't remove partial file {}: {}", path.display(), e);
        }
    }

    result
}

fn create_error(path: &Path, error: &io::Error) -> TaskError {
    if error.kind() == io::ErrorKind::NotFound {
        TaskError::DelayedWrite(path.to_path_buf())
    } else {
        write_error(path, error)
    }
}

fn write_error(path: &Path, error: &io::Error) -> TaskError {
    TaskError::Write {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
