use super::model::Genre;

/// Select the narration voice for a genre.
pub fn voice_for_genre(genre: Genre) -> &'static str {
    match genre {
        Genre::RomCom => "nova",     // Warm, soft delivery
        Genre::Horror => "onyx",     // Low, deliberate
        Genre::SciFi => "alloy",     // Neutral, even
        Genre::FilmNoir => "echo",   // Dry, world-weary
    }
}

/// Style directive passed through to the speech provider for a genre.
/// Opaque to the rest of the subsystem.
pub fn style_instructions_for(genre: Genre) -> &'static str {
    match genre {
        Genre::RomCom => {
            "Narrate with playful warmth and light comedic timing, letting the \
             romantic beats breathe. Keep the pace moderately brisk."
        }
        Genre::Horror => {
            "Narrate in a low, tense voice that builds dread slowly. Lean into \
             pauses before reveals while keeping every word clear."
        }
        Genre::SciFi => {
            "Narrate with a sense of wonder and measured precision, as if \
             reporting from somewhere unfamiliar. Keep the pace moderately brisk."
        }
        Genre::FilmNoir => {
            "Narrate like a hard-boiled detective recounting the case: dry, \
             unhurried, a little weary, with clipped emphasis on the turns."
        }
    }
}
