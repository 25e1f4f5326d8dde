//! Unix-specific file operations

use std::path::Path;

use crate::modules::files::utils::FileError;

/// Create a symbolic link at `dest` pointing to `src`
pub async fn create_symlink(src: &Path, dest: &Path) -> Result<(), FileError> {
    tokio::fs::symlink(src, dest).await?;
    Ok(())
}

/// Create a hard link at `dest` for the file at `src`
pub async fn create_hardlink(src: &Path, dest: &Path) -> Result<(), FileError> {
    tokio::fs::hard_link(src, dest).await?;
    Ok(())
}

/// Create `path` and every missing ancestor with mode `0744` (before umask)
pub async fn create_dir_tree(path: &Path) -> Result<(), FileError> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true).mode(0o744);
    builder.create(path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_links_do_not_replace_existing_paths() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source");
        let taken = temp_dir.path().join("taken");
        std::fs::write(&src, "data").unwrap();
        std::fs::write(&taken, "keep").unwrap();

        assert!(matches!(
            create_symlink(&src, &taken).await,
            Err(FileError::Io { .. })
        ));
        assert!(matches!(
            create_hardlink(&src, &taken).await,
            Err(FileError::Io { .. })
        ));
        assert_eq!(std::fs::read_to_string(&taken).unwrap(), "keep");
    }

    #[tokio::test]
    async fn test_hardlink_needs_existing_source() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let dest = temp_dir.path().join("dest");

        assert!(create_hardlink(&missing, &dest).await.is_err());

        // A dangling symlink is allowed
        create_symlink(&missing, &dest).await.unwrap();
        assert_eq!(std::fs::read_link(&dest).unwrap(), missing);
    }

    #[tokio::test]
    async fn test_create_dir_tree_then_link_inside() {
        let temp_dir = TempDir::new().unwrap();
        let deep = temp_dir.path().join("a/b/c");

        create_dir_tree(&deep).await.unwrap();
        create_dir_tree(&deep).await.unwrap();
        assert!(deep.is_dir());

        let src = temp_dir.path().join("source");
        std::fs::write(&src, "data").unwrap();
        let hard = deep.join("hard");
        create_hardlink(&src, &hard).await.unwrap();
        assert_eq!(
            std::fs::metadata(&hard).unwrap().ino(),
            std::fs::metadata(&src).unwrap().ino()
        );
    }
}
