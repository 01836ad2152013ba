/// Delivery priority of a registered listener.
///
/// Listeners for a destination are invoked from highest to lowest priority.
/// `Verification` sits below everything else so that audit-style listeners
/// always observe a message last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Priority {
    Higher,
    High,
    Normal,
    Low,
    Verification,
}

impl Priority {
    fn code(self) -> i32 {
        match self {
            Priority::Higher => 20,
            Priority::High => 10,
            Priority::Normal => 0,
            Priority::Low => -10,
            Priority::Verification => -100,
        }
    }

    pub fn is_higher_than(self, other: Priority) -> bool {
        self.code() > other.code()
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code().cmp(&other.code())
    }
}
