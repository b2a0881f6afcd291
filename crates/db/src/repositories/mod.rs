//! Repository layer.

pub mod editor_grant;
pub mod form;
pub mod question;
pub mod question_option;
pub mod response;
pub mod user;

pub use editor_grant::EditorGrantRepository;
pub use form::FormRepository;
pub use question::QuestionRepository;
pub use question_option::QuestionOptionRepository;
pub use response::ResponseRepository;
pub use user::UserRepository;
