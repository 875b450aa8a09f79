//! Collaborators consumed by the registration workflow.

mod notifier;
mod user_directory;

pub use notifier::{LogNotifier, Notifier, VerificationEmail};
pub use user_directory::{InMemoryUserDirectory, UserDirectory};

#[cfg(any(test, feature = "test-utils"))]
pub use notifier::MockNotifier;
#[cfg(any(test, feature = "test-utils"))]
pub use user_directory::MockUserDirectory;
