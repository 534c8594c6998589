//! Polyphonic keyboard pool of pulse voices.

use alloc::vec::Vec;
use ct_ir::VoiceConfig;

use crate::envelope::AdsrStage;
use crate::pulse::PulseVoice;

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Voices in a keyboard pool unless asked otherwise.
pub const POLYPHONY: usize = 4;

#[derive(Clone, Debug)]
struct Slot {
    voice: PulseVoice,
    /// MIDI note last started on this slot
    note: Option<u8>,
}

/// Fixed set of identically configured pulse voices played by note number.
#[derive(Clone, Debug)]
pub struct PulsePool {
    slots: Vec<Slot>,
}

impl PulsePool {
    pub fn new(config: VoiceConfig, sample_rate: u32, polyphony: usize) -> Self {
        let slots = (0..polyphony)
            .map(|_| Slot { voice: PulseVoice::new(config, sample_rate), note: None })
            .collect();
        Self { slots }
    }

    /// Start `note` on a free or stolen voice, returning the slot used.
    /// Velocity 0 releases the note instead. Returns `None` when every
    /// voice is still held.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Option<VoiceId> {
        if velocity == 0 {
            self.note_off(note);
            return None;
        }
        let id = self.steal_slot()?;
        let slot = &mut self.slots[id];
        slot.voice.on_midi_note(note, velocity);
        slot.note = Some(note);
        Some(id)
    }

    /// Release every voice playing `note`. Returns how many were released.
    pub fn note_off(&mut self, note: u8) -> usize {
        let mut released = 0;
        for slot in &mut self.slots {
            if slot.note == Some(note) && slot.voice.stage() != AdsrStage::Idle {
                slot.voice.on_note_off();
                released += 1;
            }
        }
        released
    }

    /// Pick a slot for a new note: the first idle one, otherwise the
    /// quietest voice already in release. Held voices are never taken.
    fn steal_slot(&self) -> Option<VoiceId> {
        if let Some(id) = self.slots.iter().position(|s| s.voice.stage() == AdsrStage::Idle) {
            return Some(id);
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.voice.stage() == AdsrStage::Release)
            .min_by_key(|(_, s)| s.voice.volume())
            .map(|(id, _)| id)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&PulseVoice> {
        self.slots.get(id).map(|s| &s.voice)
    }

    pub fn polyphony(&self) -> usize {
        self.slots.len()
    }

    /// Voices that are not idle.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.voice.stage() != AdsrStage::Idle).count()
    }

    pub fn tick_envelope(&mut self) {
        for slot in &mut self.slots {
            slot.voice.tick_envelope();
        }
    }

    /// Add every voice into `buffer`.
    pub fn render(&mut self, buffer: &mut [i32]) {
        for slot in &mut self.slots {
            slot.voice.render(buffer);
        }
    }
}
