use super::{ArtifactStore, Role, new_request_id};

fn store() -> (tempfile::TempDir, ArtifactStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path()).unwrap();
    (dir, store)
}

#[test]
fn request_ids_are_compact_and_unique() {
    let a = new_request_id();
    let b = new_request_id();
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

#[test]
fn allocate_is_namespaced_by_request_id() {
    let (_dir, store) = store();
    let a = store.allocate(&new_request_id(), Role::Video, ".mp4");
    let b = store.allocate(&new_request_id(), Role::Video, ".mp4");
    assert_ne!(a, b);

    let id = new_request_id();
    let audio = store.allocate(&id, Role::Audio, ".mp3");
    let image = store.allocate(&id, Role::Image, ".jpg");
    assert_ne!(audio, image);
    assert!(audio.file_name().unwrap().to_str().unwrap().starts_with("audio_"));
    assert!(image.file_name().unwrap().to_str().unwrap().starts_with("image_"));
}

#[tokio::test]
async fn write_then_release_removes_the_file() {
    let (_dir, store) = store();
    let path = store.allocate(&new_request_id(), Role::Audio, ".mp3");

    let artifact = store.write(&path, b"abc").await.unwrap();
    assert_eq!(artifact.size_bytes, 3);
    assert!(path.is_file());

    store.release(&path).await;
    assert!(!path.exists());
}

#[tokio::test]
async fn release_is_idempotent() {
    let (_dir, store) = store();
    let path = store.allocate(&new_request_id(), Role::Image, ".jpg");

    // Never written; releasing must not panic or error.
    store.release(&path).await;
    store.release(&path).await;
}

#[tokio::test]
async fn resolve_download_rejects_traversal() {
    let (_dir, store) = store();
    let path = store.allocate(&new_request_id(), Role::Video, ".mp4");
    store.write(&path, b"mp4").await.unwrap();
    let name = path.file_name().unwrap().to_str().unwrap();

    assert_eq!(store.resolve_download(name), Some(path.clone()));
    assert_eq!(store.resolve_download(""), None);
    assert_eq!(store.resolve_download("missing.mp4"), None);
    assert_eq!(store.resolve_download(&format!("../{}", name)), None);
    assert_eq!(store.resolve_download("a/b.mp4"), None);
    assert_eq!(store.resolve_download("a\\b.mp4"), None);
}
