pub mod environment;
pub mod paths;
pub mod terminal;

pub use environment::get_claude_projects_dir;
pub use paths::{
    decode_segment, encode_segment, format_path_with_tilde, safe_open_file,
    validate_file_size, validate_path_not_symlink,
};
pub use terminal::{preview_line, strip_ansi_codes};
