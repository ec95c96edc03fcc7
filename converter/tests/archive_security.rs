use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use claims::*;
use converter::ConversionError;
use converter::archive::{extract_file, extract_zip};

async fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipFileWriter::new(Vec::<u8>::new());
    for (name, data) in entries {
        let builder = ZipEntryBuilder::new(name.to_string().into(), Compression::Deflate);
        writer.write_entry_whole(builder, data).await.unwrap();
    }
    writer.close().await.unwrap()
}

#[cfg(test)]
mod zip_slip_tests {
    use super::*;

    #[tokio::test]
    async fn test_parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("extract");
        let bytes = zip_bytes(&[("themes/../../../pwned.txt", b"evil")]).await;

        let error = assert_err!(extract_zip(bytes.as_slice(), &target).await);

        assert_matches!(error, ConversionError::PathEscape { .. });
        assert!(!dir.path().join("pwned.txt").exists());
    }

    #[tokio::test]
    async fn test_absolute_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("/tmp/theme-porter-absolute.txt", b"evil")]).await;

        let error = assert_err!(extract_zip(bytes.as_slice(), dir.path()).await);

        assert_matches!(error, ConversionError::PathEscape { .. });
    }

    #[tokio::test]
    async fn test_backslash_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("extract");
        let bytes = zip_bytes(&[("..\\..\\pwned.txt", b"evil")]).await;

        let error = assert_err!(extract_zip(bytes.as_slice(), &target).await);

        assert_matches!(error, ConversionError::PathEscape { .. });
        assert!(!dir.path().join("pwned.txt").exists());
    }

    #[tokio::test]
    async fn test_dot_segments_inside_the_root_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("a/b/../c/./theme.json", b"{}")]).await;

        let summary = assert_ok!(extract_zip(bytes.as_slice(), dir.path()).await);

        assert_eq!(summary.files, 1);
        assert!(dir.path().join("a/c/theme.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_directory_cannot_redirect_writes() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        let target = dir.path().join("extract");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::create_dir_all(&target).unwrap();
        std::os::unix::fs::symlink(&outside, target.join("link")).unwrap();
        let bytes = zip_bytes(&[("link/evil.txt", b"evil")]).await;

        let error = assert_err!(extract_zip(bytes.as_slice(), &target).await);

        assert_matches!(error, ConversionError::PathEscape { .. });
        assert!(!outside.join("evil.txt").exists());
    }

    #[tokio::test]
    async fn test_extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("theme.vsix");
        let bytes = zip_bytes(&[
            ("extension/package.json", b"{}"),
            ("extension/themes/a.json", b"{}"),
        ])
        .await;
        std::fs::write(&archive, bytes).unwrap();

        let summary = assert_ok!(extract_file(&archive, &dir.path().join("out")).await);

        assert_eq!(summary.files, 2);
    }

    #[tokio::test]
    async fn test_truncated_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("themes/theme.json", b"{\"name\": \"cut\"}")]).await;
        // Cut inside the file name of the first local header.
        let truncated = &bytes[..35];

        let error = assert_err!(extract_zip(truncated, &dir.path().join("out")).await);

        assert_matches!(error, ConversionError::Extraction(_));
    }
}
