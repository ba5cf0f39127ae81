//! Shared layout constants (all in pixels).

/// The width of a staff line
pub const LINE_WIDTH: i32 = 1;
/// The left margin of each staff
pub const LEFT_MARGIN: i32 = 4;
/// The vertical space between staff lines
pub const LINE_SPACE: i32 = 7;
/// The height between the five horizontal staff lines
pub const STAFF_HEIGHT: i32 = LINE_SPACE * 4 + LINE_WIDTH * 5;
/// The height of a notehead
pub const NOTE_HEIGHT: i32 = LINE_SPACE + LINE_WIDTH;
/// The width of a notehead
pub const NOTE_WIDTH: i32 = 3 * LINE_SPACE / 2;
/// The width of a page when scrolling vertically
pub const PAGE_WIDTH: i32 = 800;
/// The height of a page when printing
pub const PAGE_HEIGHT: i32 = 1050;
/// The horizontal space a full-size clef occupies
pub const CLEF_WIDTH: i32 = 32;
