//! Basic example: an in-memory container store end to end.
//!
//! Run with: `cargo run -p lockbox-gateway --example basic`

use std::sync::Arc;

use bytes::Bytes;

use lockbox_blob::memory::MemoryBlobStore;
use lockbox_core::{AccessMode, UploadId};
use lockbox_gateway::{ChunkMeta, ChunkOutcome, CreateContainer, Gateway};
use lockbox_registry_memory::{MemoryContainerLock, MemoryRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let gateway = Gateway::builder()
        .registry(Arc::new(MemoryRegistry::new()))
        .locks(Arc::new(MemoryContainerLock::new()))
        .blobs(Arc::new(MemoryBlobStore::new()))
        .build()
        .expect("gateway should build");

    // A container that self-destructs after two unlocks.
    let container = gateway
        .create_container(CreateContainer {
            name: "weekend-trip".into(),
            visitor_secret: "p1".into(),
            admin_secret: None,
            access_mode: AccessMode::Standard,
            max_views: 2,
        })
        .await
        .expect("create should succeed");
    println!("created container {} ({})", container.name, container.id);

    // Upload a small file in two chunks, out of order.
    let upload = UploadId::new("demo-upload");
    let meta = ChunkMeta {
        filename: "hello.txt".into(),
        mime_type: "text/plain".into(),
        declared_size: 11,
    };
    for (index, bytes) in [(1u32, &b"world!"[..]), (0u32, &b"hello"[..])] {
        let outcome = gateway
            .put_chunk(
                &container.id,
                &upload,
                index,
                2,
                Bytes::copy_from_slice(bytes),
                meta.clone(),
            )
            .await
            .expect("chunk should be accepted");
        match outcome {
            ChunkOutcome::Pending { received, total_chunks, .. } => {
                println!("chunk {index} buffered ({received}/{total_chunks})");
            }
            ChunkOutcome::Complete { file } => {
                println!("file committed: {} ({} bytes)", file.original_name, file.size);
            }
        }
    }

    // Two unlocks; the second one takes the container with it.
    let first = gateway.verify(&container.id, "p1").await.expect("unlock");
    println!(
        "first unlock: views {}/{}, destroyed: {}",
        first.container.current_views, first.container.max_views, first.destroyed
    );
    let last = gateway.verify(&container.id, "p1").await.expect("unlock");
    println!(
        "second unlock: views {}/{}, destroyed: {}",
        last.container.current_views, last.container.max_views, last.destroyed
    );

    let gone = gateway.verify(&container.id, "p1").await;
    println!("third unlock: {gone:?}");
}
