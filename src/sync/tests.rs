use super::*;
use crate::codec::fnt;
use crate::core::{Glyph, test_png};
use crate::host::SimulatedHost;

const SESSION: &str = "Atlas";

fn image(width: u32, height: u32) -> AtlasImage {
    AtlasImage::from_png(test_png(width, height)).unwrap()
}

/// `n` 10×10 glyphs laid out 20 per row, ids starting at 1.
fn grid(n: u32) -> GlyphSet {
    (0..n)
        .map(|i| Glyph::new(i + 1, (i % 20) * 10, (i / 20) * 10, 10, 10))
        .collect()
}

fn grid_image() -> AtlasImage {
    image(200, 100)
}

async fn sync(host: &mut SimulatedHost, image: &AtlasImage, glyphs: &GlyphSet) -> SyncReport {
    synchronize(host, image, glyphs, SESSION, &SyncOptions::default())
        .await
        .unwrap()
}

fn outline(host: &SimulatedHost) -> String {
    host.document().unwrap().outline()
}

fn expected_outline(ids: impl IntoIterator<Item = u32>) -> String {
    let mut out = String::from("Atlas_Glyphs/\n");
    for id in ids {
        out.push_str(&format!("  Glyph_{id}\n"));
    }
    out
}

#[tokio::test]
async fn test_end_to_end_skips_zero_width_glyph() {
    let glyphs = fnt::parse(
        "char id=65 x=0 y=0 width=10 height=10\nchar id=66 x=10 y=0 width=0 height=10\n",
    );
    let mut host = SimulatedHost::new();

    let report = sync(&mut host, &image(20, 10), &glyphs).await;

    assert_eq!(report.glyph_layers, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.created_document);
    let doc = host.document().unwrap();
    assert_eq!(doc.name, SESSION);
    assert_eq!((doc.width, doc.height), (20, 10));
    assert_eq!(doc.outline(), "Atlas_Glyphs/\n  Glyph_65\n");
}

#[tokio::test]
async fn test_recovers_from_every_document_state() {
    let glyphs = grid(5);
    let image = grid_image();
    let expected = expected_outline(1..=5);

    let hosts = [
        SimulatedHost::new(),
        SimulatedHost::with_document("Untitled", 50, 50),
        SimulatedHost::with_document("Untitled", 50, 50)
            .with_layer("Background")
            .with_layer("Sketch"),
        SimulatedHost::with_document("Untitled", 50, 50)
            .with_group("Atlas_Glyphs", &["Glyph_9", "Glyph_8"])
            .with_layer("Notes"),
    ];

    for mut host in hosts {
        sync(&mut host, &image, &glyphs).await;
        assert_eq!(outline(&host), expected);
        let doc = host.document().unwrap();
        assert_eq!((doc.width, doc.height), (200, 100));
    }
}

#[tokio::test]
async fn test_second_run_reaches_same_state() {
    let glyphs = grid(12);
    let image = grid_image();
    let mut host = SimulatedHost::new();

    let first = sync(&mut host, &image, &glyphs).await;
    let after_first = outline(&host);
    let second = sync(&mut host, &image, &glyphs).await;

    assert_eq!(outline(&host), after_first);
    assert_eq!(first.glyph_layers, second.glyph_layers);
    assert!(first.created_document);
    assert!(!second.created_document);
}

#[tokio::test]
async fn test_degenerate_glyphs_are_skipped() {
    let glyphs: GlyphSet = vec![
        Glyph::new(1, 0, 0, 10, 10),
        Glyph::new(2, 10, 0, 0, 10),
        Glyph::new(3, 20, 0, 10, 0),
        Glyph::new(4, 30, 0, 10, 10),
    ]
    .into();
    let mut host = SimulatedHost::new();

    let report = sync(&mut host, &grid_image(), &glyphs).await;

    assert_eq!(report.glyph_layers, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(outline(&host), expected_outline([1, 4]));
}

#[tokio::test]
async fn test_chunk_boundaries_do_not_change_output() {
    let image = grid_image();

    for n in [29, 30, 31, 61] {
        let glyphs = grid(n);
        let expected = expected_outline(1..=n);

        for chunk_size in [1, 7, 30, 100] {
            let options = SyncOptions {
                chunk_size,
                ..SyncOptions::default()
            };
            let mut host = SimulatedHost::new();
            let report = synchronize(&mut host, &image, &glyphs, SESSION, &options)
                .await
                .unwrap();

            assert_eq!(outline(&host), expected, "n={n} chunk_size={chunk_size}");
            assert_eq!(report.chunks, (n as usize).div_ceil(chunk_size));
        }
    }
}

#[tokio::test]
async fn test_slicing_batches_follow_chunk_size() {
    let mut host = SimulatedHost::new();
    let report = sync(&mut host, &grid_image(), &grid(61)).await;
    assert_eq!(report.chunks, 3);

    // create, 3 wipe batches, place, discard, 3 slice chunks, delete source, group
    assert_eq!(host.batch_count(), 11);
}

#[tokio::test]
async fn test_new_document_starting_layer_is_removed() {
    let mut host = SimulatedHost::new();
    sync(&mut host, &grid_image(), &grid(2)).await;

    let doc = host.document().unwrap();
    assert!(doc.find("Layer 1").is_none());
    assert_eq!(doc.top_level_names(), vec!["Atlas_Glyphs"]);
}

#[tokio::test]
async fn test_resync_with_glyph_layer_selected() {
    let glyphs = grid(4);
    let image = grid_image();
    let mut host = SimulatedHost::new();
    sync(&mut host, &image, &glyphs).await;

    // The user clicked a layer inside the group between runs
    host.execute_batch(&[Command::select("Glyph_2")]).await.unwrap();

    let report = sync(&mut host, &image, &glyphs).await;
    assert!(!report.created_document);
    assert_eq!(outline(&host), expected_outline(1..=4));
}

#[tokio::test]
async fn test_staged_atlas_is_released() {
    let mut host = SimulatedHost::with_document("Untitled", 10, 10).with_layer("Background");
    sync(&mut host, &grid_image(), &grid(3)).await;
    assert_eq!(host.staged_count(), 0);

    let mut host = SimulatedHost::with_document("Untitled", 10, 10)
        .with_layer("Background")
        .fail_on("copyToLayer", 1, HostError::failed("copyToLayer", "boom"));
    synchronize(&mut host, &grid_image(), &grid(3), SESSION, &SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(host.staged_count(), 0);
}

#[tokio::test]
async fn test_layer_stacking_follows_glyph_order() {
    let glyphs: GlyphSet = vec![
        Glyph::new(3, 0, 0, 10, 10),
        Glyph::new(1, 10, 0, 10, 10),
        Glyph::new(2, 20, 0, 10, 10),
    ]
    .into();
    let mut host = SimulatedHost::new();
    sync(&mut host, &grid_image(), &glyphs).await;

    let children = host.document().unwrap().group_children("Atlas_Glyphs").unwrap();
    assert_eq!(children, vec!["Glyph_3", "Glyph_1", "Glyph_2"]);
}

#[tokio::test]
async fn test_duplicate_ids_yield_same_named_layers() {
    let glyphs: GlyphSet = vec![Glyph::new(7, 0, 0, 10, 10), Glyph::new(7, 10, 0, 10, 10)].into();
    let mut host = SimulatedHost::new();
    sync(&mut host, &grid_image(), &glyphs).await;
    assert_eq!(outline(&host), expected_outline([7, 7]));
}

#[tokio::test]
async fn test_glyph_marquee_uses_image_coordinates() {
    let glyphs: GlyphSet = vec![Glyph::new(1, 12, 4, 6, 5)].into();
    let mut host = SimulatedHost::new();
    sync(&mut host, &image(20, 10), &glyphs).await;

    let marquee = host.executed().iter().find_map(|c| match c {
        Command::SetMarquee(rect) => Some(*rect),
        _ => None,
    });
    assert_eq!(
        marquee,
        Some(crate::core::Rect {
            top: 4,
            left: 12,
            bottom: 9,
            right: 18
        })
    );
}

#[tokio::test]
async fn test_missing_input_fails_before_touching_document() {
    let mut host = SimulatedHost::with_document("Untitled", 10, 10).with_layer("Keep");

    let empty = AtlasImage::new(10, 10, Vec::new());
    let err = synchronize(&mut host, &empty, &grid(1), SESSION, &SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingInput(_)));

    let degenerate: GlyphSet = vec![Glyph::new(1, 0, 0, 0, 0)].into();
    let err = synchronize(&mut host, &grid_image(), &degenerate, SESSION, &SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingInput(_)));

    assert_eq!(host.batch_count(), 0);
    assert_eq!(outline(&host), "Keep\n");
}

#[tokio::test]
async fn test_structural_failures_report_their_phase() {
    let boom = |kind| HostError::failed(kind, "boom");
    let cases = [
        ("imageSize", 0, Phase::PrepareTarget),
        ("placeEvent", 0, Phase::PlaceAtlas),
        ("delete", 1, Phase::DiscardPlaceholder),
        ("copyToLayer", 2, Phase::SliceGlyphs),
        ("make", 1, Phase::Finalize),
    ];

    for (kind, nth, phase) in cases {
        let mut host = SimulatedHost::with_document("Untitled", 10, 10)
            .with_layer("Background")
            .fail_on(kind, nth, boom(kind));
        let err = synchronize(&mut host, &grid_image(), &grid(5), SESSION, &SyncOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.phase(), Some(phase), "failure in `{kind}`");
    }
}

#[tokio::test]
async fn test_failed_run_is_recovered_by_next_run() {
    let glyphs = grid(8);
    let image = grid_image();
    let mut host = SimulatedHost::with_document("Untitled", 10, 10)
        .with_layer("Background")
        .fail_on("copyToLayer", 3, HostError::failed("copyToLayer", "boom"));

    let err = synchronize(&mut host, &image, &glyphs, SESSION, &SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::SliceGlyphs));
    // Partial state: source layer plus the glyphs sliced before the failure
    assert!(host.document().unwrap().find("AtlasSource").is_some());

    sync(&mut host, &image, &glyphs).await;
    assert_eq!(outline(&host), expected_outline(1..=8));
}

#[tokio::test]
async fn test_wipe_is_verified_by_layer_list() {
    // The host claims nothing was selected but leaves the layers in place
    let mut host = SimulatedHost::with_document("Untitled", 10, 10)
        .with_layer("Background")
        .fail_on("delete", 0, HostError::absent("no layers selected"));

    let err = synchronize(&mut host, &grid_image(), &grid(2), SESSION, &SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::PrepareTarget));
}

#[tokio::test]
async fn test_stale_placeholder_is_swept() {
    let mut host = SimulatedHost::with_document("Untitled", 10, 10)
        .with_layer("Temp_Safe_Layer")
        .with_layer("AtlasSource");

    sync(&mut host, &grid_image(), &grid(3)).await;

    assert_eq!(outline(&host), expected_outline(1..=3));
}

#[tokio::test]
async fn test_custom_names() {
    let options = SyncOptions {
        chunk_size: 2,
        group_name: "Font_A".into(),
        source_layer: "Src".into(),
        placeholder_layer: "Hold".into(),
    };
    let mut host = SimulatedHost::with_document("Untitled", 10, 10).with_layer("Background");
    synchronize(&mut host, &grid_image(), &grid(3), SESSION, &options)
        .await
        .unwrap();

    let doc = host.document().unwrap();
    assert_eq!(doc.top_level_names(), vec!["Font_A"]);
    assert!(doc.find("Src").is_none());
    assert!(doc.find("Hold").is_none());
}

#[test]
fn test_unique_name() {
    let taken = vec!["Temp".to_string(), "Temp_1".to_string()];
    assert_eq!(unique_name("Temp", &taken), "Temp_2");
    assert_eq!(unique_name("Other", &taken), "Other");
}
