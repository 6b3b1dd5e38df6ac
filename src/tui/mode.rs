use ratatui::layout::{Position, Rect};

// Which widget gets the keyboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Board,
    Search,
    Results,
}

// screen areas from the last frame, so mouse positions can be resolved
// to catalog buttons, track rows and results
#[derive(Clone, Debug, Default)]
pub struct HitMap {
    pub catalog: Vec<Rect>,
    pub track_list: Option<Rect>,
    pub track_rows: Vec<Rect>,
    pub first_track: usize, // index of the track in track_rows[0]
    pub results: Vec<Rect>,
}

impl HitMap {
    pub fn catalog_at(&self, x: u16, y: u16) -> Option<usize> {
        find(&self.catalog, x, y)
    }

    pub fn track_at(&self, x: u16, y: u16) -> Option<usize> {
        find(&self.track_rows, x, y).map(|row| row + self.first_track)
    }

    pub fn result_at(&self, x: u16, y: u16) -> Option<usize> {
        find(&self.results, x, y)
    }

    pub fn over_track_list(&self, x: u16, y: u16) -> bool {
        self.track_list.is_some_and(|r| r.contains(Position::new(x, y)))
    }
}

fn find(rects: &[Rect], x: u16, y: u16) -> Option<usize> {
    rects.iter().position(|r| r.contains(Position::new(x, y)))
}

// A catalog button held down with the mouse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Drag {
    pub sound: usize,
    pub x: u16,
    pub y: u16,
}

// state local to the tui: focus, the drag in progress and where things
// were drawn. board_open / video_open are synced from DisplayState per loop
#[derive(Clone, Debug)]
pub struct TuiState {
    pub focus: Focus,
    pub drag: Option<Drag>,
    pub hits: HitMap,
    pub board_open: bool,
    pub video_open: bool,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            focus: Focus::Board,
            drag: None,
            hits: HitMap::default(),
            board_open: true,
            video_open: true,
        }
    }
}

impl TuiState {
    // Keep focus on something that is on screen.
    pub fn sync_panels(&mut self, board_open: bool, video_open: bool) {
        self.board_open = board_open;
        self.video_open = video_open;
        if !video_open {
            self.focus = Focus::Board;
        }
        if !board_open {
            self.drag = None;
        }
    }

    pub fn is_dragging_over_tracks(&self) -> bool {
        self.drag
            .is_some_and(|d| self.hits.over_track_list(d.x, d.y))
    }
}
