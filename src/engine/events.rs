// -------------------------------------------------------------------------------------------------

/// A note event, passed along with an output block to the engine.
///
/// Frame offsets are relative to the start of the block the event is passed with. Events must
/// be sorted by frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    NoteOn {
        frame: usize,
        note: u8,
        velocity: f32,
    },
    NoteOff {
        frame: usize,
        note: u8,
    },
    AllNotesOff {
        frame: usize,
    },
}

impl NoteEvent {
    /// Frame offset of the event in its block.
    pub fn frame(&self) -> usize {
        match *self {
            Self::NoteOn { frame, .. } | Self::NoteOff { frame, .. } | Self::AllNotesOff { frame } => {
                frame
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Diagnostic events, sent from the audio context to the control context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineDiagnostic {
    /// A live grain got stolen to make room for a new one.
    GrainStolen { id: u64, remaining: usize },
    /// A newly published source buffer got picked up by the audio context.
    SourceSwapped { generation: u64, frames: usize },
}

// -------------------------------------------------------------------------------------------------

/// Tracks held notes for note gated grain triggering. Real-time safe.
#[derive(Debug, Clone)]
pub(crate) struct NoteGate {
    held: [bool; 128],
    held_count: usize,
}

impl Default for NoteGate {
    fn default() -> Self {
        Self {
            held: [false; 128],
            held_count: 0,
        }
    }
}

impl NoteGate {
    /// True while at least one note is held.
    pub fn is_open(&self) -> bool {
        self.held_count > 0
    }

    pub fn apply(&mut self, event: &NoteEvent) {
        match *event {
            NoteEvent::NoteOn { note, velocity, .. } => {
                // note-on with zero velocity is a note-off
                if velocity > 0.0 {
                    self.set_held(note, true);
                } else {
                    self.set_held(note, false);
                }
            }
            NoteEvent::NoteOff { note, .. } => self.set_held(note, false),
            NoteEvent::AllNotesOff { .. } => self.reset(),
        }
    }

    pub fn reset(&mut self) {
        self.held = [false; 128];
        self.held_count = 0;
    }

    fn set_held(&mut self, note: u8, held: bool) {
        let Some(slot) = self.held.get_mut(note as usize) else {
            return;
        };
        if *slot != held {
            *slot = held;
            if held {
                self.held_count += 1;
            } else {
                self.held_count -= 1;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_gate() {
        let mut gate = NoteGate::default();
        assert!(!gate.is_open());
        gate.apply(&NoteEvent::NoteOn {
            frame: 0,
            note: 60,
            velocity: 1.0,
        });
        gate.apply(&NoteEvent::NoteOn {
            frame: 0,
            note: 60,
            velocity: 0.5,
        });
        gate.apply(&NoteEvent::NoteOn {
            frame: 2,
            note: 64,
            velocity: 1.0,
        });
        assert!(gate.is_open());
        gate.apply(&NoteEvent::NoteOff { frame: 3, note: 60 });
        assert!(gate.is_open());
        gate.apply(&NoteEvent::NoteOn {
            frame: 4,
            note: 64,
            velocity: 0.0,
        });
        assert!(!gate.is_open());
        // releasing unheld or invalid notes is harmless
        gate.apply(&NoteEvent::NoteOff { frame: 5, note: 60 });
        gate.apply(&NoteEvent::NoteOff {
            frame: 5,
            note: 200,
        });
        assert!(!gate.is_open());

        gate.apply(&NoteEvent::NoteOn {
            frame: 6,
            note: 1,
            velocity: 1.0,
        });
        gate.apply(&NoteEvent::AllNotesOff { frame: 7 });
        assert!(!gate.is_open());
        assert_eq!(NoteEvent::AllNotesOff { frame: 7 }.frame(), 7);
    }
}
