mod common;

use common::budget_alloc::BudgetAlloc;
use common::fixtures::profile_fixtures;
use keratovision::{AdaptiveRenderer, MemoryDocument, RendererOptions, STYLE_ID};

// Full passes peak well under 64KiB today; keep headroom for new fragments.
const APPLY_PASS_BUDGET_BYTES: usize = 128 * 1024;

#[global_allocator]
static ALLOC: BudgetAlloc = BudgetAlloc::new();

#[test]
fn apply_pass_under_heap_budget_for_fixtures() {
    for (name, profile) in profile_fixtures() {
        let mut renderer =
            AdaptiveRenderer::new(MemoryDocument::default(), RendererOptions::default());
        // Warm pass creates the elements; the measured pass overwrites.
        renderer
            .apply(&profile)
            .unwrap_or_else(|e| panic!("warm apply {}: {}", name, e));

        let (result, report) = ALLOC.measure(|| renderer.apply(&profile));
        result.unwrap_or_else(|e| panic!("apply {}: {}", name, e));
        assert!(renderer.document().count_with_id(STYLE_ID) == 1);

        assert!(
            report.peak_bytes <= APPLY_PASS_BUDGET_BYTES,
            "apply peak over budget for {}: {} bytes ({:.1}KB), budget: {}KB",
            name,
            report.peak_bytes,
            report.peak_kib(),
            APPLY_PASS_BUDGET_BYTES / 1024
        );
        println!(
            "apply profile={} peak_kib={:.1} allocs={}",
            name,
            report.peak_kib(),
            report.allocs
        );
    }
}
