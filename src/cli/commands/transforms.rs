//! Transform catalog listing

use etl_pipeline::transform::TransformKind;

/// Print the catalog in the order transforms are applied
pub fn handle_transforms() {
    for (position, kind) in TransformKind::ALL.iter().enumerate() {
        println!("{}. {:<8} {}", position + 1, kind.suffix(), kind.description());
    }
}
