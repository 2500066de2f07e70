//! Cooking mode: step-by-step view state for a recipe.
//!
//! Pure state, no I/O. The caller drives the step timer by calling
//! [`CookingSession::tick`] once per second.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{Ingredient, Recipe, RecipeStep};

/// Rescale a quantity written for `base_portions` to `portions`.
///
/// `adjusted = base * portions / base_portions`. A non-positive base leaves the
/// quantity untouched.
pub fn scale_quantity(base: f64, base_portions: i64, portions: i64) -> f64 {
    if base_portions <= 0 {
        return base;
    }
    base * portions as f64 / base_portions as f64
}

/// Ingredient line as displayed in cooking mode.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledIngredient {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    /// Consumed by a completed step.
    pub struck: bool,
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// No timer on the current step.
    Idle,
    Paused(u32),
    Running(u32),
    /// Reached zero on this tick, or earlier.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepTimer {
    remaining: u32,
    running: bool,
}

#[derive(Debug, Clone)]
pub struct CookingSession {
    base_portions: i64,
    portions: i64,
    ingredients: Vec<Ingredient>,
    steps: Vec<RecipeStep>,
    current: usize,
    completed: BTreeSet<String>,
    timer: Option<StepTimer>,
}

impl CookingSession {
    pub fn new(recipe: &Recipe) -> Self {
        let mut steps = recipe.steps.clone();
        steps.sort_by_key(|s| s.order);

        Self {
            base_portions: recipe.base_portions,
            portions: recipe.base_portions.max(1),
            ingredients: recipe.ingredients.clone(),
            steps,
            current: 0,
            completed: BTreeSet::new(),
            timer: None,
        }
    }

    // ==================== STEP NAVIGATION ====================

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Option<&RecipeStep> {
        self.steps.get(self.current)
    }

    /// Move to the next step. Returns false on the last step.
    pub fn next(&mut self) -> bool {
        if self.current + 1 >= self.steps.len() {
            return false;
        }
        self.move_to(self.current + 1);
        true
    }

    /// Move to the previous step. Returns false on the first step.
    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.move_to(self.current - 1);
        true
    }

    /// Jump to a step by index. Out-of-range indices are ignored.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.steps.len() {
            return false;
        }
        if index != self.current {
            self.move_to(index);
        }
        true
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.timer = None;
    }

    // ==================== COMPLETION ====================

    /// Flip the completion state of a step. Returns the new state, or `None`
    /// for an unknown step id.
    pub fn toggle_step(&mut self, step_id: &str) -> Option<bool> {
        if !self.steps.iter().any(|s| s.id == step_id) {
            return None;
        }
        if self.completed.remove(step_id) {
            Some(false)
        } else {
            self.completed.insert(step_id.to_string());
            Some(true)
        }
    }

    /// Mark the current step done and advance when possible.
    pub fn complete_current(&mut self) {
        if let Some(step) = self.steps.get(self.current) {
            self.completed.insert(step.id.clone());
            self.next();
        }
    }

    pub fn is_completed(&self, step_id: &str) -> bool {
        self.completed.contains(step_id)
    }

    /// Fraction of steps completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.steps.len() as f64
    }

    pub fn is_finished(&self) -> bool {
        !self.steps.is_empty() && self.completed.len() == self.steps.len()
    }

    // ==================== PORTIONS & INGREDIENTS ====================

    pub fn portions(&self) -> i64 {
        self.portions
    }

    /// Set the portion count, never below one.
    pub fn set_portions(&mut self, portions: i64) {
        self.portions = portions.max(1);
    }

    pub fn increase_portions(&mut self) {
        self.set_portions(self.portions + 1);
    }

    pub fn decrease_portions(&mut self) {
        self.set_portions(self.portions - 1);
    }

    /// Ingredients rescaled to the current portions, with strike-through state.
    pub fn ingredients(&self) -> Vec<ScaledIngredient> {
        self.ingredients
            .iter()
            .map(|ingredient| ScaledIngredient {
                id: ingredient.id.clone(),
                name: ingredient.name.clone(),
                quantity: scale_quantity(ingredient.quantity, self.base_portions, self.portions),
                unit: ingredient.unit.clone(),
                struck: self.is_consumed(&ingredient.name),
            })
            .collect()
    }

    fn is_consumed(&self, ingredient_name: &str) -> bool {
        let wanted = ingredient_name.to_lowercase();
        self.steps
            .iter()
            .filter(|step| self.completed.contains(&step.id))
            .flat_map(|step| step.ingredients.iter())
            .any(|used| used.to_lowercase() == wanted)
    }

    // ==================== STEP TIMER ====================

    /// Start the countdown for the current step's duration. Returns false when
    /// the step has no duration.
    pub fn start_timer(&mut self) -> bool {
        let Some(minutes) = self.current_step().and_then(|s| s.duration) else {
            return false;
        };
        if minutes <= 0 {
            return false;
        }
        let minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
        self.timer = Some(StepTimer {
            remaining: minutes.saturating_mul(60),
            running: true,
        });
        true
    }

    pub fn pause_timer(&mut self) {
        if let Some(timer) = &mut self.timer {
            timer.running = false;
        }
    }

    pub fn resume_timer(&mut self) {
        if let Some(timer) = &mut self.timer {
            if timer.remaining > 0 {
                timer.running = true;
            }
        }
    }

    pub fn reset_timer(&mut self) {
        self.timer = None;
    }

    /// Seconds left, if a timer exists for the current step.
    pub fn timer_remaining(&self) -> Option<u32> {
        self.timer.map(|t| t.remaining)
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TimerTick {
        let Some(timer) = &mut self.timer else {
            return TimerTick::Idle;
        };
        if timer.remaining == 0 {
            return TimerTick::Finished;
        }
        if !timer.running {
            return TimerTick::Paused(timer.remaining);
        }

        timer.remaining -= 1;
        if timer.remaining == 0 {
            timer.running = false;
            TimerTick::Finished
        } else {
            TimerTick::Running(timer.remaining)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn ingredient(id: &str, name: &str, quantity: f64, unit: &str) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
        }
    }

    fn step(id: &str, order: i64, duration: Option<i64>, uses: &[&str]) -> RecipeStep {
        RecipeStep {
            id: id.to_string(),
            order,
            description: format!("Étape {}", order),
            duration,
            ingredients: uses.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn madeleines() -> Recipe {
        Recipe {
            id: "r1".to_string(),
            title: "Madeleines".to_string(),
            slug: "madeleines".to_string(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            prep_time: 15,
            cook_time: 10,
            base_portions: 4,
            category: "goûter".to_string(),
            image: None,
            published: true,
            created_at: String::new(),
            updated_at: String::new(),
            ingredients: vec![
                ingredient("i1", "Farine", 200.0, "g"),
                ingredient("i2", "Beurre", 125.0, "g"),
                ingredient("i3", "Oeufs", 3.0, ""),
            ],
            // Deliberately out of order: the session sorts by `order`.
            steps: vec![
                step("s2", 2, Some(2), &["beurre"]),
                step("s1", 1, None, &["Farine", "Oeufs"]),
                step("s3", 3, Some(10), &[]),
            ],
        }
    }

    #[test]
    fn test_scale_quantity() {
        assert_eq!(scale_quantity(200.0, 4, 8), 400.0);
        assert_eq!(scale_quantity(3.0, 4, 2), 1.5);
        assert_eq!(scale_quantity(125.0, 4, 4), 125.0);
        assert_eq!(scale_quantity(10.0, 0, 3), 10.0);
    }

    #[test]
    fn test_scaling_applies_ratio_to_every_ingredient() {
        let recipe = madeleines();
        let mut session = CookingSession::new(&recipe);
        session.set_portions(6);

        for (scaled, base) in session.ingredients().iter().zip(&recipe.ingredients) {
            assert_eq!(scaled.quantity, base.quantity * 6.0 / 4.0);
        }
    }

    #[test]
    fn test_portions_never_below_one() {
        let mut session = CookingSession::new(&madeleines());
        session.set_portions(1);
        session.decrease_portions();
        assert_eq!(session.portions(), 1);
        session.increase_portions();
        assert_eq!(session.portions(), 2);
        session.set_portions(-5);
        assert_eq!(session.portions(), 1);
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut session = CookingSession::new(&madeleines());
        assert_eq!(session.current_step().unwrap().id, "s1");
        assert!(!session.previous());
        assert!(session.next());
        assert!(session.next());
        assert!(!session.next());
        assert_eq!(session.current_index(), 2);
        assert!(!session.go_to(3));
        assert!(session.go_to(0));
        assert_eq!(session.current_step().unwrap().id, "s1");
    }

    #[test]
    fn test_completing_step_strikes_only_its_ingredients() {
        let mut session = CookingSession::new(&madeleines());
        assert_eq!(session.toggle_step("s1"), Some(true));

        let struck: Vec<_> = session
            .ingredients()
            .into_iter()
            .filter(|i| i.struck)
            .map(|i| i.name)
            .collect();
        assert_eq!(struck, vec!["Farine", "Oeufs"]);

        // Names match case-insensitively.
        session.toggle_step("s2");
        assert!(session.ingredients().iter().all(|i| i.struck));

        assert_eq!(session.toggle_step("s1"), Some(false));
        let struck: Vec<_> = session
            .ingredients()
            .into_iter()
            .filter(|i| i.struck)
            .map(|i| i.name)
            .collect();
        assert_eq!(struck, vec!["Beurre"]);

        assert_eq!(session.toggle_step("nope"), None);
    }

    #[test]
    fn test_complete_current_advances_and_tracks_progress() {
        let mut session = CookingSession::new(&madeleines());
        session.complete_current();
        assert!(session.is_completed("s1"));
        assert_eq!(session.current_index(), 1);
        session.complete_current();
        session.complete_current();
        assert_eq!(session.current_index(), 2);
        assert!(session.is_finished());
        assert_eq!(session.progress(), 1.0);
    }

    #[test]
    fn test_timer_counts_down_and_finishes() {
        let mut session = CookingSession::new(&madeleines());
        // First step has no duration.
        assert!(!session.start_timer());
        assert_eq!(session.tick(), TimerTick::Idle);

        session.next();
        assert!(session.start_timer());
        assert_eq!(session.timer_remaining(), Some(120));
        assert_eq!(session.tick(), TimerTick::Running(119));

        session.pause_timer();
        assert_eq!(session.tick(), TimerTick::Paused(119));
        session.resume_timer();

        for _ in 0..118 {
            assert!(matches!(session.tick(), TimerTick::Running(_)));
        }
        assert_eq!(session.tick(), TimerTick::Finished);
        assert_eq!(session.tick(), TimerTick::Finished);
        assert_eq!(session.timer_remaining(), Some(0));
    }

    #[test]
    fn test_changing_step_clears_timer() {
        let mut session = CookingSession::new(&madeleines());
        session.go_to(1);
        session.start_timer();
        session.tick();
        session.next();
        assert_eq!(session.timer_remaining(), None);
        assert_eq!(session.tick(), TimerTick::Idle);

        session.start_timer();
        session.go_to(2);
        // Same index: the timer survives.
        assert_eq!(session.timer_remaining(), Some(600));
    }

    #[test]
    fn test_oversized_duration_saturates_timer() {
        let mut recipe = madeleines();
        recipe.steps = vec![step("s1", 1, Some(4_294_967_296), &[])];
        let mut session = CookingSession::new(&recipe);

        assert!(session.start_timer());
        assert_eq!(session.timer_remaining(), Some(u32::MAX));
        assert_eq!(session.tick(), TimerTick::Running(u32::MAX - 1));
    }
}
