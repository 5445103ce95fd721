use crate::host::PreviewSink;
use crate::model::Note;

#[derive(Clone, Debug, PartialEq)]
pub struct PreviewCue {
    pub row: usize,
    pub note: Note,
}

impl PreviewCue {
    pub fn new(row: usize, note: Note) -> Self {
        Self { row, note }
    }
}

/// Forwards preview cues to a sink, dropping repeats of the row/octave
/// pair that is already sounding.
#[derive(Debug, Default)]
pub struct PreviewBridge {
    sounding: Option<(usize, i8)>,
}

impl PreviewBridge {
    pub fn is_sounding(&self) -> bool {
        self.sounding.is_some()
    }

    pub fn cue(&mut self, cue: PreviewCue, sink: &mut impl PreviewSink) {
        let key = (cue.row, cue.note.octave_shift);
        if self.sounding == Some(key) {
            return;
        }
        self.sounding = Some(key);
        sink.preview_note(cue.row, &cue.note);
    }

    pub fn stop(&mut self, sink: &mut impl PreviewSink) {
        if self.sounding.take().is_some() {
            sink.stop_preview_note();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        started: Vec<(usize, i8)>,
        stopped: usize,
    }

    impl PreviewSink for RecordingSink {
        fn preview_note(&mut self, row: usize, note: &Note) {
            self.started.push((row, note.octave_shift));
        }

        fn stop_preview_note(&mut self) {
            self.stopped += 1;
        }
    }

    #[test]
    fn test_repeated_cue_is_deduplicated() {
        let mut sink = RecordingSink::default();
        let mut bridge = PreviewBridge::default();
        bridge.cue(PreviewCue::new(3, Note::new(1)), &mut sink);
        bridge.cue(PreviewCue::new(3, Note::new(4)), &mut sink);
        bridge.cue(PreviewCue::new(4, Note::new(1)), &mut sink);
        bridge.cue(PreviewCue::new(4, Note::new(1).with_octave_shift(1)), &mut sink);
        assert_eq!(sink.started, vec![(3, 0), (4, 0), (4, 1)]);
    }

    #[test]
    fn test_stop_is_forwarded_once() {
        let mut sink = RecordingSink::default();
        let mut bridge = PreviewBridge::default();
        bridge.stop(&mut sink);
        assert_eq!(sink.stopped, 0);
        bridge.cue(PreviewCue::new(0, Note::new(1)), &mut sink);
        bridge.stop(&mut sink);
        bridge.stop(&mut sink);
        assert_eq!(sink.stopped, 1);
        assert!(!bridge.is_sounding());
    }
}
