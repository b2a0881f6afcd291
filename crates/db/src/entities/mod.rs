//! Database entities.

pub mod editor_grant;
pub mod form;
pub mod question;
pub mod question_option;
pub mod response;
pub mod user;

pub use editor_grant::Entity as EditorGrant;
pub use form::Entity as Form;
pub use question::Entity as Question;
pub use question_option::Entity as QuestionOption;
pub use response::Entity as Response;
pub use user::Entity as User;
