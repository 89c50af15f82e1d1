mod web_page;

pub use web_page::{extract_text, WebPageLoader};
