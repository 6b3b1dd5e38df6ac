// Types shared by the TUI and the middle layer.
//
// The TUI turns keys and mouse gestures into `InputEvent`s and renders a
// `DisplayState` every frame; everything stateful (loops, the cache, the
// search) lives behind the middle layer.
//
// Board keys:
//   1 .. 9        //  DropSound(0 .. 8)
//   Up / Down     //  SelectPrevTrack / SelectNextTrack
//   Space         //  ToggleTrack
//   + / -         //  TempoUp / TempoDown
//   ] / [         //  VolumeUp / VolumeDown
//   p             //  PreviewTrack
//   x / Delete    //  RemoveTrack
//   S             //  StopAll
//   t             //  SyncTempo (selected track's speed on every loop)
//   m             //  VoiceSearch
//   b / y         //  ToggleBoard / ToggleVideo
//
// Mouse:
//   drag a catalog button onto the track list  //  DropSound(n)
//   click a catalog button                     //  PreviewSound(n)
//   click a track row / a result               //  SelectTrack(n) / SelectResult(n)

use crate::tempo::Tempo;

pub const MAX_HOTKEY_SOUNDS: usize = 9;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // catalog
    DropSound(usize),
    PreviewSound(usize),

    // track list
    SelectTrack(usize),
    SelectNextTrack,
    SelectPrevTrack,
    ToggleTrack,
    TempoUp,
    TempoDown,
    VolumeUp,
    VolumeDown,
    PreviewTrack,
    RemoveTrack,
    StopAll,
    SyncTempo,

    // video panel
    QueryChar(char),
    QueryBackspace,
    SubmitSearch,
    VoiceSearch,
    NextResult,
    PrevResult,
    PlayResult,
    SelectResult(usize),

    // panels
    ToggleBoard,
    ToggleVideo,

    Quit,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayState {
    pub status: Option<String>,
    pub catalog: Vec<CatalogButton>,
    pub tracks: Vec<TrackView>,
    pub selected_track: Option<usize>,
    pub board_open: bool,
    pub video_open: bool,
    pub search: SearchView,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogButton {
    pub label: String,
    pub color: Option<(u8, u8, u8)>,
    pub category: String,
    pub loaded: bool,
    pub loading: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackView {
    pub label: String,
    pub color: Option<(u8, u8, u8)>,
    pub active: bool,
    pub tempo: Tempo,
    pub volume: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub loading: bool,
    pub error: Option<&'static str>,
    pub results: Vec<ResultView>,
    pub selected: usize,
    pub current_video: String,
    pub embed_url: String,
    pub listening: bool,
    pub voice_supported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultView {
    pub title: String,
    pub channel: String,
}
