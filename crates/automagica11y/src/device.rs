//! Device and user preference checks

use ama_dom::Document;

/// At least one fine pointer (mouse, precision trackpad) is available
pub fn has_fine_pointer(doc: &Document) -> bool {
    doc.media().any_fine_pointer
}

pub fn prefers_reduced_motion(doc: &Document) -> bool {
    doc.media().prefers_reduced_motion
}

/// The host paints frames, so animation frame callbacks will run
pub fn has_animation_frames(doc: &Document) -> bool {
    doc.media().animation_frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use ama_dom::MediaFeatures;

    #[test]
    fn test_reads_media_features() {
        let mut doc = Document::new();
        assert!(has_fine_pointer(&doc));
        assert!(!prefers_reduced_motion(&doc));
        doc.set_media(MediaFeatures {
            prefers_reduced_motion: true,
            any_fine_pointer: false,
            animation_frames: false,
        });
        assert!(!has_fine_pointer(&doc));
        assert!(prefers_reduced_motion(&doc));
        assert!(!has_animation_frames(&doc));
    }
}
