// Handles shared between the control side and the audio thread. Both are
// minted by the owner on the control side (the buffer cache hands out
// sample ids, the playback controller hands out voice ids), so no global
// counter is needed.

// A decoded buffer registered with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

// One playing instance of a sample inside the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

#[derive(Debug, Default)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn next(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}
