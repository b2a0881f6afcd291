//! Business logic services.

#![allow(missing_docs)]

pub mod access;
pub mod account;
pub mod autosave;
pub mod event_publisher;
pub mod form;
pub mod invite;
pub mod resolver;
pub mod tally;
pub mod user;
pub mod vote;

pub use access::{AccessService, Capability};
pub use account::AccountService;
pub use autosave::{DebouncedSaver, SaveState, Saver};
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use form::{
    CreateFormInput, FormDetail, FormService, OptionSave, QuestionDetail, QuestionSave,
    UpdateFormInput,
};
pub use invite::{InviteService, Redemption};
pub use resolver::{PinResolver, ResolveOutcome};
pub use tally::{FormResults, OptionTally, QuestionTally, TallyService};
pub use user::{CreateUserInput, UserService};
pub use vote::{BallotSelection, VoteService};
