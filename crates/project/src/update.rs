use crate::Project;
use std::fmt;

/// A change to an externally owned [`Project`].
///
/// Hosts receive these through their update callback and decide how to apply
/// them. `Modify` is evaluated against whatever project the host holds at
/// apply time, so two queued appends never overwrite each other.
pub enum ProjectUpdate {
    Replace(Project),
    Modify(Box<dyn FnOnce(&Project) -> Project + Send>),
}

impl ProjectUpdate {
    pub fn modify<F>(f: F) -> Self
    where
        F: FnOnce(&Project) -> Project + Send + 'static,
    {
        ProjectUpdate::Modify(Box::new(f))
    }

    pub fn apply_to(self, current: &Project) -> Project {
        match self {
            ProjectUpdate::Replace(project) => project,
            ProjectUpdate::Modify(f) => f(current),
        }
    }
}

impl fmt::Debug for ProjectUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectUpdate::Replace(project) => f
                .debug_tuple("Replace")
                .field(&project.name)
                .finish(),
            ProjectUpdate::Modify(_) => f.write_str("Modify(..)"),
        }
    }
}

impl From<Project> for ProjectUpdate {
    fn from(project: Project) -> Self {
        ProjectUpdate::Replace(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_ignores_current() {
        let current = Project::new("old");
        let next = ProjectUpdate::from(Project::new("new")).apply_to(&current);
        assert_eq!(next.name, "new");
    }

    #[test]
    fn modify_reads_current() {
        let current = Project::new("reel").with_starting_sequence_number(3);
        let next = ProjectUpdate::modify(|p| {
            p.with_starting_sequence_number(p.starting_sequence_number + 1)
        })
        .apply_to(&current);
        assert_eq!(next.starting_sequence_number, 4);
        assert_eq!(current.starting_sequence_number, 3);
    }
}
