mod comparator;
mod ownership;
mod record;

pub use comparator::{compare, Comparator};
pub use ownership::{derive_ownership_percentage, OwnershipMatcher, OwnershipPredicate};
pub use record::{ComparisonLayer, ComparisonRecord};
