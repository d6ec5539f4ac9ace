use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use serde_json::Map;
use stowage_core::{
    Error, File, FileFactory, ImageVariantCollection, Operation, PathBuilder, PathBuilderConfig,
    ProcessorConfig, TemplatePathBuilder, Variant,
};
use stowage_processing::{PassthroughOptimizer, Processor, StackProcessor, VariantProcessor};
use stowage_storage::{FileStorage, MemoryStorage, StorageAdapterFactory, StorageOp, StorageService};
use tempfile::TempDir;

struct Fixture {
    memory: MemoryStorage,
    files: FileStorage,
    processor: VariantProcessor,
    path_builder: Arc<dyn PathBuilder>,
    scratch: TempDir,
}

async fn fixture() -> Fixture {
    let service = StorageService::new(StorageAdapterFactory::empty());
    let memory = MemoryStorage::new();
    service
        .add_adapter("local", Arc::new(memory.clone()))
        .await
        .unwrap();
    let service = Arc::new(service);

    let path_builder: Arc<dyn PathBuilder> =
        Arc::new(TemplatePathBuilder::new(PathBuilderConfig::default()).unwrap());
    let scratch = tempfile::tempdir().unwrap();

    let config = ProcessorConfig {
        temp_dir: Some(scratch.path().to_path_buf()),
        ..ProcessorConfig::default()
    };
    let processor = VariantProcessor::new(service.clone(), path_builder.clone(), config)
        .with_optimizer(Arc::new(PassthroughOptimizer));
    let files = FileStorage::new(service).with_path_builder(path_builder.clone());

    Fixture {
        memory,
        files,
        processor,
        path_builder,
        scratch,
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 255])));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn photo() -> File {
    let mut variants = ImageVariantCollection::new();
    variants
        .add_new("thumb", |v| v.resize(10, 10, true, false))
        .unwrap();
    variants.add_new("mirror", |v| v.flip_horizontal()).unwrap();
    variants
        .add_new("square", |v| v.fit(8, None, false).optimize())
        .unwrap();
    variants.add_new("declared", |v| v).unwrap();

    FileFactory::new()
        .from_bytes(png(40, 20), "photo.png", None, "local")
        .belongs_to_model("Album", 7)
        .with_variants(variants.into_variants(), false)
}

fn scratch_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

async fn stored_dimensions(memory: &MemoryStorage, path: &str) -> (u32, u32) {
    let data = memory.get(path).await.unwrap();
    image::load_from_memory(&data).unwrap().dimensions()
}

#[tokio::test]
async fn test_unsupported_mime_type_is_left_alone() {
    let fx = fixture().await;
    let file = FileFactory::new()
        .from_bytes(&b"plain text"[..], "notes.txt", None, "local")
        .with_path("notes.txt")
        .with_variant("thumb", Variant::new(vec![Operation::new("flipVertical", Map::new())]));

    let processed = fx.processor.process(file.clone()).await.unwrap();

    assert_eq!(processed.variants(), file.variants());
    assert!(fx.memory.operations().await.is_empty());
}

#[tokio::test]
async fn test_process_materializes_variants() {
    let fx = fixture().await;
    let stored = fx.files.store(photo()).await.unwrap();

    let processed = fx.processor.process(stored.clone()).await.unwrap();

    let thumb = processed.variant("thumb").unwrap().path().to_string();
    let mirror = processed.variant("mirror").unwrap().path().to_string();
    let square = processed.variant("square").unwrap().path().to_string();
    assert!(!processed.variant("declared").unwrap().has_path());

    assert_eq!(thumb, fx.path_builder.path_for_variant(&stored, "thumb").unwrap());
    assert_ne!(thumb, stored.path().unwrap());
    assert!(thumb.ends_with(".png"));

    assert_eq!(
        fx.memory.operations().await,
        vec![
            StorageOp::Write(stored.path().unwrap().to_string()),
            StorageOp::Write(thumb.clone()),
            StorageOp::Write(mirror.clone()),
            StorageOp::Write(square.clone()),
        ]
    );

    assert_eq!(stored_dimensions(&fx.memory, &thumb).await, (10, 5));
    assert_eq!(stored_dimensions(&fx.memory, &mirror).await, (40, 20));
    assert_eq!(stored_dimensions(&fx.memory, &square).await, (8, 8));
    assert!(scratch_is_empty(fx.scratch.path()));
}

#[tokio::test]
async fn test_only_selected_variants() {
    let fx = fixture().await;
    let stored = fx.files.store(photo()).await.unwrap();

    let processed = fx
        .processor
        .process_variants(stored, &["mirror".to_string()])
        .await
        .unwrap();

    assert!(processed.variant("mirror").unwrap().has_path());
    assert!(!processed.variant("thumb").unwrap().has_path());
    assert_eq!(fx.memory.operations().await.len(), 2);
}

#[tokio::test]
async fn test_original_is_read_from_storage_without_resource() {
    let fx = fixture().await;
    let stored = fx.files.store(photo()).await.unwrap().without_resource();

    let processed = fx.processor.process(stored).await.unwrap();

    let thumb = processed.variant("thumb").unwrap().path().to_string();
    assert_eq!(stored_dimensions(&fx.memory, &thumb).await, (10, 5));
}

#[tokio::test]
async fn test_unsupported_operation_writes_nothing() {
    let fx = fixture().await;
    let file = photo()
        .with_path("Album/photo.png")
        .with_variants(
            [(
                "rotated".to_string(),
                Variant::new(vec![Operation::new("rotate", Map::new())]),
            )]
            .into_iter()
            .collect(),
            false,
        );

    let result = fx.processor.process(file).await;

    assert!(matches!(result, Err(Error::UnsupportedOperation(name)) if name == "rotate"));
    assert!(fx.memory.operations().await.is_empty());
    assert!(scratch_is_empty(fx.scratch.path()));
}

#[tokio::test]
async fn test_later_unsupported_operation_is_found_before_any_write() {
    let fx = fixture().await;
    let mut variants = ImageVariantCollection::new();
    variants.add_new("mirror", |v| v.flip_vertical()).unwrap();
    let file = FileFactory::new()
        .from_bytes(png(40, 20), "photo.png", None, "local")
        .with_path("Album/photo.png")
        .with_variants(variants.into_variants(), false)
        .with_variant(
            "rotated",
            Variant::new(vec![Operation::new("rotate", Map::new())]),
        );

    let result = fx.processor.process(file).await;

    assert!(matches!(result, Err(Error::UnsupportedOperation(name)) if name == "rotate"));
    assert!(fx.memory.operations().await.is_empty());
    assert!(scratch_is_empty(fx.scratch.path()));
}

#[tokio::test]
async fn test_nothing_selected_skips_staging() {
    let fx = fixture().await;
    let file = FileFactory::new()
        .from_bytes(&b""[..], "empty.png", None, "local")
        .with_path("Album/empty.png")
        .with_variants(photo().variants().clone(), false);

    let processed = fx
        .processor
        .process_variants(file.clone(), &["missing".to_string()])
        .await
        .unwrap();

    assert_eq!(processed.variants(), file.variants());
    assert!(fx.memory.operations().await.is_empty());
    assert!(scratch_is_empty(fx.scratch.path()));
}

#[tokio::test]
async fn test_failed_variant_keeps_earlier_ones() {
    let fx = fixture().await;
    let mut variants = ImageVariantCollection::new();
    variants.add_new("mirror", |v| v.flip_vertical()).unwrap();
    variants
        .add_new("outside", |v| v.crop(5, 5, Some(100), Some(0)))
        .unwrap();

    let file = FileFactory::new()
        .from_bytes(png(40, 20), "photo.png", None, "local")
        .with_path("Album/photo.png")
        .with_variants(variants.into_variants(), false);

    let result = fx.processor.process(file).await;

    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    let writes = fx.memory.operations().await;
    assert_eq!(writes.len(), 1);
    assert!(matches!(&writes[0], StorageOp::Write(path) if path.contains("photo.")));
    assert!(scratch_is_empty(fx.scratch.path()));
}

#[tokio::test]
async fn test_stack_runs_variant_processor() {
    let fx = fixture().await;
    let stored = fx.files.store(photo()).await.unwrap();

    let stack = StackProcessor::new(vec![Arc::new(fx.processor)]);
    let processed = stack.process(stored).await.unwrap();

    assert_eq!(processed.variant_paths().len(), 3);
}
