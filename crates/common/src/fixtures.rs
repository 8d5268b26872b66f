//! The fixed set of notes every submission must render

/// A note that must be visible on the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredNote {
    pub title: &'static str,
    /// Substring of the note body; matching tolerates surrounding text
    pub body: &'static str,
}

const fn note(title: &'static str, body: &'static str) -> RequiredNote {
    RequiredNote { title, body }
}

/// Exactly fifteen notes. The render check requires all of them, no more.
pub const REQUIRED_NOTES: [RequiredNote; 15] = [
    note("Welcome to Notes, Dimas!", "Welcome to Notes! This is your first note."),
    note("Meeting Agenda", "Discuss project updates and assign tasks"),
    note("Shopping List", "Milk, eggs, bread, fruits"),
    note("Personal Goals", "Read two books per month"),
    note("Recipe: Spaghetti Bolognese", "Ingredients: ground beef"),
    note("Workout Routine", "Monday: Cardio"),
    note("Book Recommendations", "1. 'The Alchemist'"),
    note("Daily Reflections", "Write down three positive things"),
    note("Travel Bucket List", "1. Paris, France"),
    note("Coding Projects", "1. Build a personal website"),
    note("Project Deadline", "Complete project tasks by the deadline"),
    note("Health Checkup", "Schedule a routine health checkup"),
    note("Financial Goals", "1. Create a monthly budget"),
    note("Holiday Plans", "Research and plan for the upcoming holiday"),
    note("Language Learning", "Practice Spanish vocabulary"),
];
