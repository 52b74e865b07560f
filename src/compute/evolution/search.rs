//! The generational search loop and restart orchestration.

use std::sync::Arc;
use std::time::Instant;

use crate::compute::{CogArray, LayoutError};
use crate::schema::{
    CogCatalog, CogId, ConfigError, EvolutionHistory, EvolutionProgress, EvolutionStats,
    SearchConfig, SelectionMethod, Slot, SlotSet, StopReason,
};

use super::controller::IterationController;
use super::fitness::{FitnessError, FitnessEvaluator, ObjectiveProbe, ObjectiveScores};
use super::operators::LayoutRng;

/// Search errors.
///
/// Layout errors surfacing here mean an operator broke a layout invariant.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Fitness evaluation failed: {0}")]
    Fitness(#[from] FitnessError),
    #[error("Layout invariant violated: {0}")]
    Layout(#[from] LayoutError),
    #[error("Search produced no candidates")]
    NoCandidates,
}

/// A candidate layout in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The layout.
    pub layout: CogArray,
    /// Fitness score.
    pub fitness: f64,
    /// Generation created (or carried into, for elites).
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

/// One generation of scored candidates.
///
/// Built once and only read afterwards; the next generation is bred from a
/// shared reference to this one.
#[derive(Debug)]
pub struct Generation {
    index: usize,
    members: Vec<Candidate>,
    /// Member positions by descending fitness, ties by ascending id.
    ranking: Vec<usize>,
}

impl Generation {
    fn new(index: usize, members: Vec<Candidate>) -> Self {
        let mut ranking: Vec<usize> = (0..members.len()).collect();
        ranking.sort_by(|&a, &b| {
            members[b]
                .fitness
                .total_cmp(&members[a].fitness)
                .then(members[a].id.cmp(&members[b].id))
        });
        Self {
            index,
            members,
            ranking,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members by descending fitness.
    pub fn ranked(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.ranking.iter().map(|&i| &self.members[i])
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.ranked().next()
    }

    /// Mean and standard deviation of fitness.
    fn fitness_moments(&self) -> (f64, f64) {
        if self.members.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.members.len() as f64;
        let mean = self.members.iter().map(|c| c.fitness).sum::<f64>() / n;
        let variance = self
            .members
            .iter()
            .map(|c| (c.fitness - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, variance.sqrt())
    }
}

/// Best layout observed so far.
#[derive(Debug, Clone)]
pub struct BestRecord {
    pub layout: CogArray,
    pub fitness: f64,
    /// Weighted per-objective contributions to `fitness`.
    pub objectives: ObjectiveScores,
    /// Zero-based restart index.
    pub restart: usize,
    /// Generation within the restart; 0 is the initial population.
    pub generation: usize,
}

/// Outcome of one restart.
#[derive(Debug, Clone)]
pub struct RestartSummary {
    pub restart: usize,
    pub generations: usize,
    pub best_fitness: f64,
    pub stop_reason: StopReason,
    pub history: EvolutionHistory,
}

/// Result of a full multi-restart search.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    pub best: BestRecord,
    pub restarts: Vec<RestartSummary>,
    pub stats: EvolutionStats,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<'a> {
    config: &'a SearchConfig,
    controller: IterationController,
    evaluator: FitnessEvaluator,
    catalog: Arc<CogCatalog>,
    slots: Arc<SlotSet>,
    rng: LayoutRng,
    seed_layout: Option<CogArray>,
    probes: Vec<ObjectiveProbe>,
    next_id: u64,
    evaluations: u64,
}

impl<'a> EvolutionEngine<'a> {
    /// Create a new evolution engine.
    ///
    /// Validates `config` and prepares the fitness weights before any search
    /// work happens.
    pub fn new(
        config: &'a SearchConfig,
        catalog: Arc<CogCatalog>,
        slots: Arc<SlotSet>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let controller = IterationController::new(config.iteration.clone())?;
        let evaluator = FitnessEvaluator::new(&config.fitness)?;
        let random_seed = config.random_seed.unwrap_or_else(rand::random);

        Ok(Self {
            config,
            controller,
            evaluator,
            catalog,
            slots,
            rng: LayoutRng::new(random_seed),
            seed_layout: None,
            probes: Vec::new(),
            next_id: 0,
            evaluations: 0,
        })
    }

    /// Replace the random number generator.
    ///
    /// The reported seed becomes the seed of `rng`, if it has one.
    pub fn with_rng(mut self, rng: LayoutRng) -> Self {
        self.rng = rng;
        self
    }

    /// Include a known layout as the first member of every initial
    /// population.
    pub fn with_seed_layout(mut self, layout: &CogArray) -> Result<Self, SearchError> {
        let placements: Vec<(Slot, CogId)> =
            layout.placements().map(|(slot, cog)| (slot, cog.id)).collect();
        let rebuilt =
            CogArray::from_placements(Arc::clone(&self.catalog), Arc::clone(&self.slots), &placements)?;
        if rebuilt.num_occupied() == 0 {
            return Err(FitnessError::MissingOccupancy.into());
        }
        self.seed_layout = Some(rebuilt);
        Ok(self)
    }

    /// Track an extra objective for every individual.
    pub fn with_objective_probe(mut self, probe: ObjectiveProbe) -> Self {
        self.probes.push(probe);
        self
    }

    /// Track the build-only, flaggy-only and exp-only objectives.
    pub fn with_standard_probes(mut self) -> Self {
        self.probes.extend(self.evaluator.objective_probes());
        self
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    pub fn controller(&self) -> &IterationController {
        &self.controller
    }

    /// Seed of the active generator, if known.
    pub fn random_seed(&self) -> Option<u64> {
        self.rng.seed()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn evaluate(&mut self, layout: &CogArray) -> Result<f64, SearchError> {
        self.evaluations += 1;
        Ok(self.evaluator.evaluate(layout)?)
    }

    /// Build and score the initial population of a restart.
    fn initialize(&mut self) -> Result<Generation, SearchError> {
        let size = self.config.population_size;
        let mut members = Vec::with_capacity(size);

        if let Some(layout) = self.seed_layout.clone() {
            let id = self.next_id();
            let fitness = self.evaluate(&layout)?;
            members.push(Candidate {
                id,
                layout,
                fitness,
                generation: 0,
                parents: Vec::new(),
            });
        }

        while members.len() < size {
            let layout = self.rng.random_layout(&self.catalog, &self.slots)?;
            let id = self.next_id();
            let fitness = self.evaluate(&layout)?;
            members.push(Candidate {
                id,
                layout,
                fitness,
                generation: 0,
                parents: Vec::new(),
            });
        }

        Ok(Generation::new(0, members))
    }

    /// Produce the next generation from `previous`.
    ///
    /// Elites are carried over unchanged. The rest are offspring of selected
    /// parents, with the fitter parent passed first to crossover so it wins
    /// slot conflicts. Mutation events then hit non-elite offspring only.
    fn breed(&mut self, previous: &Generation) -> Result<Generation, SearchError> {
        let size = self.config.population_size;
        let elitism = self.config.elitism.min(previous.len());
        let index = previous.index() + 1;
        let breeding = *self.controller.breeding();

        let mut members: Vec<Candidate> = previous
            .ranked()
            .take(elitism)
            .map(|elite| Candidate {
                generation: index,
                ..elite.clone()
            })
            .collect();

        while members.len() < size {
            let first = &previous.members()[self.select_index(previous)];
            let second = &previous.members()[self.select_index(previous)];
            let (parent_a, parent_b) = if second.fitness > first.fitness {
                (second, first)
            } else {
                (first, second)
            };

            let layout = self
                .rng
                .crossover(&parent_a.layout, &parent_b.layout, breeding.crossover)?;
            let id = self.next_id();
            members.push(Candidate {
                id,
                layout,
                fitness: 0.0,
                generation: index,
                parents: vec![parent_a.id, parent_b.id],
            });
        }

        if let Some(one_point_share) = breeding.one_point_share()
            && size > elitism
        {
            for _ in 0..self.controller.num_mutations() {
                let target = elitism + self.rng.index(size - elitism);
                let layout = &mut members[target].layout;
                if self.rng.chance(one_point_share) {
                    self.rng.mutate_one_point(layout)?;
                } else {
                    self.rng.mutate_two_point(layout);
                }
            }
        }

        for member in members.iter_mut().skip(elitism) {
            self.evaluations += 1;
            member.fitness = self.evaluator.evaluate(&member.layout)?;
        }

        Ok(Generation::new(index, members))
    }

    /// Select a parent index using the configured method.
    fn select_index(&mut self, generation: &Generation) -> usize {
        let members = generation.members();
        match self.config.selection {
            SelectionMethod::Tournament { size } => {
                let mut best_idx = self.rng.index(members.len());
                for _ in 1..size {
                    let idx = self.rng.index(members.len());
                    if members[idx].fitness > members[best_idx].fitness {
                        best_idx = idx;
                    }
                }
                best_idx
            }
            SelectionMethod::RankBased => {
                // Probability proportional to reversed rank.
                let n = members.len();
                let total_rank = n * (n + 1) / 2;
                let mut target = self.rng.index(total_rank);
                for (position, &idx) in generation.ranking.iter().enumerate() {
                    let weight = n - position;
                    if target < weight {
                        return idx;
                    }
                    target -= weight;
                }
                generation.ranking[0]
            }
            SelectionMethod::RouletteWheel => {
                let total_fitness: f64 = members.iter().map(|c| c.fitness.max(0.0)).sum();
                if total_fitness <= 0.0 {
                    return self.rng.index(members.len());
                }

                let target = self.rng.unit() * total_fitness;
                let mut cumulative = 0.0;
                for (i, candidate) in members.iter().enumerate() {
                    cumulative += candidate.fitness.max(0.0);
                    if cumulative > target {
                        return i;
                    }
                }
                generation.ranking[0]
            }
        }
    }

    /// Append generation statistics and probe values to `history`.
    fn record(&self, generation: &Generation, history: &mut EvolutionHistory) -> Result<(), SearchError> {
        let Some(best) = generation.best() else {
            return Ok(());
        };
        let (mean, std) = generation.fitness_moments();

        history.best_fitness.push(best.fitness);
        history.avg_fitness.push(mean);
        history.fitness_std.push(std);

        for probe in &self.probes {
            let of_best = probe.evaluate(&best.layout)?;
            let mut max = f64::NEG_INFINITY;
            for member in generation.members() {
                max = max.max(probe.evaluate(&member.layout)?);
            }

            let trace = history.objectives.entry(probe.name().to_string()).or_default();
            trace.of_best.push(of_best);
            trace.max.push(max);
        }

        Ok(())
    }

    /// Replace `best` if this generation holds a strictly better layout.
    fn observe(
        &self,
        generation: &Generation,
        restart: usize,
        best: &mut Option<BestRecord>,
    ) -> Result<(), SearchError> {
        let Some(candidate) = generation.best() else {
            return Ok(());
        };

        let improved = best
            .as_ref()
            .is_none_or(|record| candidate.fitness > record.fitness);
        if improved {
            log::debug!(
                "New best {:.6} (restart {}, generation {})",
                candidate.fitness,
                restart,
                generation.index()
            );
            *best = Some(BestRecord {
                layout: candidate.layout.clone(),
                fitness: candidate.fitness,
                objectives: self.evaluator.breakdown(&candidate.layout)?,
                restart,
                generation: generation.index(),
            });
        }

        Ok(())
    }

    /// Run one restart from a fresh population.
    fn run_restart<F>(
        &mut self,
        restart: usize,
        best: &mut Option<BestRecord>,
        callback: &mut F,
    ) -> Result<RestartSummary, SearchError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let mut generation = self.initialize()?;
        self.observe(&generation, restart, best)?;

        let mut history = EvolutionHistory::default();
        let stop_reason = loop {
            generation = self.breed(&generation)?;
            self.record(&generation, &mut history)?;
            self.observe(&generation, restart, best)?;

            let (avg_fitness, _) = generation.fitness_moments();
            let progress = EvolutionProgress {
                restart,
                generation: generation.index(),
                max_generations: self.controller.max_generations(),
                best_fitness: best.as_ref().map_or(f64::NEG_INFINITY, |b| b.fitness),
                generation_best: history.best_fitness.last().copied().unwrap_or(f64::NEG_INFINITY),
                avg_fitness,
            };
            log::debug!(
                "Restart {} generation {}: best {:.6}, mean {:.6}",
                restart,
                progress.generation,
                progress.generation_best,
                avg_fitness
            );
            callback(&progress);

            if let Some(reason) = self.controller.stop_reason(&history.best_fitness) {
                break reason;
            }
        };

        let best_fitness = history
            .best_fitness
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        log::info!(
            "Restart {} finished after {} generations ({:?}): best fitness {:.6}",
            restart,
            generation.index(),
            stop_reason,
            best_fitness
        );

        Ok(RestartSummary {
            restart,
            generations: generation.index(),
            best_fitness,
            stop_reason,
            history,
        })
    }

    /// Run every restart with a progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<EvolutionResult, SearchError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        log::info!(
            "Searching {} cogs over {} slots (population {}, seed {})",
            self.catalog.len(),
            self.slots.len(),
            self.config.population_size,
            self.rng
                .seed()
                .map_or_else(|| "unknown".to_string(), |seed| seed.to_string())
        );

        let mut best = None;
        let mut restarts = Vec::with_capacity(self.controller.num_restarts());
        for restart in 0..self.controller.num_restarts() {
            restarts.push(self.run_restart(restart, &mut best, &mut callback)?);
        }

        let best = best.ok_or(SearchError::NoCandidates)?;
        let elapsed = start_time.elapsed().as_secs_f64();

        Ok(EvolutionResult {
            stats: EvolutionStats {
                generations: restarts.iter().map(|r| r.generations).sum(),
                total_evaluations: self.evaluations,
                best_fitness: best.fitness,
                elapsed_seconds: elapsed,
                random_seed: self.rng.seed(),
            },
            best,
            restarts,
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, SearchError> {
        self.run_with_callback(|_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use crate::schema::{BreedingScheme, Cog, FitnessConfig, FitnessKind, IterationConfig, Weights};

    fn small_problem() -> (Arc<CogCatalog>, Arc<SlotSet>) {
        let catalog = CogCatalog::new(vec![
            Cog::new(1, 40.0, 5.0, 0.2),
            Cog::new(2, 10.0, 30.0, 0.1),
            Cog::new(3, 2.0, 2.0, 0.05),
        ])
        .unwrap();
        let slots = SlotSet::new(vec![Slot::new(0, 0), Slot::new(1, 0)]).unwrap();
        (Arc::new(catalog), Arc::new(slots))
    }

    fn scenario_config() -> SearchConfig {
        SearchConfig {
            population_size: 10,
            iteration: IterationConfig::default()
                .with_generation_info(3, 5, 10, 0.01)
                .with_mutation_info(2)
                .with_breeding_scheme_info(0.5, 0.25, 0.25),
            random_seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_small_scenario_terminates_and_fills_slots() {
        let config = scenario_config();
        let (catalog, slots) = small_problem();

        let mut engine = EvolutionEngine::new(&config, catalog, slots).unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.restarts.len(), 1);
        assert!(result.restarts[0].generations <= 5);
        assert!(result.restarts[0].generations >= 3);
        assert_eq!(result.best.layout.num_occupied(), 2);
        assert_eq!(result.stats.random_seed, Some(42));
    }

    #[test]
    fn test_same_seed_reproduces_result() {
        let config = scenario_config();
        let (catalog, slots) = small_problem();

        let first = EvolutionEngine::new(&config, catalog.clone(), slots.clone())
            .unwrap()
            .run()
            .unwrap();
        let second = EvolutionEngine::new(&config, catalog, slots)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(first.best.layout.rows(), second.best.layout.rows());
        assert_eq!(first.best.fitness, second.best.fitness);
        assert_eq!(
            first.restarts[0].history.best_fitness,
            second.restarts[0].history.best_fitness
        );
    }

    #[test]
    fn test_finds_best_pair() {
        // Two build-heavy cogs among several weak ones; pure build weight.
        let cogs = (1..=8)
            .map(|i| {
                let build = if i == 3 || i == 6 { 100.0 } else { 1.0 };
                Cog::new(i, build, 1.0, 0.0)
            })
            .collect();
        let catalog = Arc::new(CogCatalog::new(cogs).unwrap());
        let slots = Arc::new(SlotSet::new(vec![Slot::new(0, 0), Slot::new(0, 1)]).unwrap());

        let config = SearchConfig {
            population_size: 30,
            fitness: FitnessConfig {
                function: FitnessKind::AverageAffixConversion,
                weights: Weights::new(1.0, 0.0, 0.0),
            },
            iteration: IterationConfig::default()
                .with_generation_info(20, 40, 5, 1e-9)
                .with_mutation_info(10),
            random_seed: Some(7),
            ..Default::default()
        };

        let result = EvolutionEngine::new(&config, catalog, slots).unwrap().run().unwrap();
        let mut placed: Vec<u32> = result.best.layout.placements().map(|(_, c)| c.id.0).collect();
        placed.sort();
        assert_eq!(placed, vec![3, 6]);
    }

    #[test]
    fn test_best_fitness_never_decreases_within_restart() {
        let config = SearchConfig {
            population_size: 12,
            iteration: IterationConfig::default()
                .with_generation_info(8, 8, 3, 0.0)
                .with_mutation_info(6),
            random_seed: Some(3),
            ..Default::default()
        };
        let (catalog, slots) = small_problem();

        let result = EvolutionEngine::new(&config, catalog, slots).unwrap().run().unwrap();
        let history = &result.restarts[0].history.best_fitness;
        assert_eq!(history.len(), 8);
        assert!(history.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(result.restarts[0].stop_reason, StopReason::MaxGenerations);
    }

    #[test]
    fn test_best_record_spans_restarts() {
        let config = SearchConfig {
            population_size: 6,
            iteration: IterationConfig::default()
                .with_restart_info(3)
                .with_generation_info(2, 4, 2, 0.0),
            random_seed: Some(11),
            ..Default::default()
        };
        let (catalog, slots) = small_problem();

        let result = EvolutionEngine::new(&config, catalog, slots).unwrap().run().unwrap();
        assert_eq!(result.restarts.len(), 3);

        let overall = result
            .restarts
            .iter()
            .map(|r| r.best_fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(result.best.fitness >= overall);
        assert!(result.best.restart < 3);
        assert_eq!(
            result.stats.generations,
            result.restarts.iter().map(|r| r.generations).sum::<usize>()
        );
    }

    #[test]
    fn test_seed_layout_joins_population() {
        let config = SearchConfig {
            population_size: 4,
            iteration: IterationConfig::default().with_generation_info(1, 1, 1, 0.0),
            random_seed: Some(5),
            ..Default::default()
        };
        let (catalog, slots) = small_problem();
        let seed = CogArray::from_placements(
            catalog.clone(),
            slots.clone(),
            &[(Slot::new(0, 0), CogId(1)), (Slot::new(1, 0), CogId(2))],
        )
        .unwrap();

        let mut engine = EvolutionEngine::new(&config, catalog, slots)
            .unwrap()
            .with_seed_layout(&seed)
            .unwrap();
        let initial = engine.initialize().unwrap();
        assert_eq!(initial.members()[0].layout.rows(), seed.rows());
        assert_eq!(initial.len(), 4);
    }

    #[test]
    fn test_empty_seed_layout_rejected() {
        let config = scenario_config();
        let (catalog, slots) = small_problem();
        let empty = CogArray::empty(catalog.clone(), slots.clone());

        let result = EvolutionEngine::new(&config, catalog, slots)
            .unwrap()
            .with_seed_layout(&empty);
        assert!(matches!(
            result,
            Err(SearchError::Fitness(FitnessError::MissingOccupancy))
        ));
    }

    #[test]
    fn test_probes_are_recorded() {
        let config = scenario_config();
        let (catalog, slots) = small_problem();

        let mut engine = EvolutionEngine::new(&config, catalog, slots)
            .unwrap()
            .with_standard_probes();
        let result = engine.run().unwrap();
        let history = &result.restarts[0].history;

        for name in ["build", "flaggy", "exp"] {
            let trace = &history.objectives[name];
            assert_eq!(trace.of_best.len(), history.best_fitness.len());
            assert!(trace.of_best.iter().zip(&trace.max).all(|(b, m)| b <= m));
        }
    }

    #[test]
    fn test_elites_survive_unchanged() {
        let config = SearchConfig {
            population_size: 8,
            elitism: 2,
            iteration: IterationConfig::default().with_mutation_info(50),
            random_seed: Some(13),
            ..Default::default()
        };
        let (catalog, slots) = small_problem();
        let mut engine = EvolutionEngine::new(&config, catalog, slots).unwrap();

        let initial = engine.initialize().unwrap();
        let elite_ids: Vec<u64> = initial.ranked().take(2).map(|c| c.id).collect();
        let elite_rows: Vec<_> = initial.ranked().take(2).map(|c| c.layout.rows()).collect();

        let next = engine.breed(&initial).unwrap();
        assert_eq!(next.len(), 8);
        assert_eq!(next.index(), 1);
        for (i, id) in elite_ids.iter().enumerate() {
            assert_eq!(next.members()[i].id, *id);
            assert_eq!(next.members()[i].layout.rows(), elite_rows[i]);
        }
        assert!(next.best().unwrap().fitness >= initial.best().unwrap().fitness);
    }

    #[test]
    fn test_fitter_parent_recorded_first() {
        let config = SearchConfig {
            population_size: 12,
            elitism: 2,
            random_seed: Some(19),
            ..scenario_config()
        };
        let (catalog, slots) = small_problem();
        let mut engine = EvolutionEngine::new(&config, catalog, slots).unwrap();

        let initial = engine.initialize().unwrap();
        let fitness_of = |id: u64| {
            initial
                .members()
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.fitness)
                .unwrap()
        };

        let next = engine.breed(&initial).unwrap();
        let offspring = &next.members()[2..];
        assert!(!offspring.is_empty());
        for child in offspring {
            assert_eq!(child.parents.len(), 2);
            assert!(fitness_of(child.parents[0]) >= fitness_of(child.parents[1]));
        }
    }

    #[test]
    fn test_injected_rng_sets_reported_seed() {
        let config = scenario_config();
        let (catalog, slots) = small_problem();

        let mut engine = EvolutionEngine::new(&config, Arc::clone(&catalog), Arc::clone(&slots))
            .unwrap()
            .with_rng(LayoutRng::new(99));
        assert_eq!(engine.random_seed(), Some(99));
        let injected = engine.run().unwrap();
        assert_eq!(injected.stats.random_seed, Some(99));

        let seeded = SearchConfig {
            random_seed: Some(99),
            ..scenario_config()
        };
        let expected = EvolutionEngine::new(&seeded, Arc::clone(&catalog), Arc::clone(&slots))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(injected.best.layout.rows(), expected.best.layout.rows());
        assert_eq!(injected.stats.generations, expected.stats.generations);

        let mut engine = EvolutionEngine::new(&config, catalog, slots)
            .unwrap()
            .with_rng(LayoutRng::from_rng(StdRng::seed_from_u64(5)));
        assert_eq!(engine.random_seed(), None);
        assert_eq!(engine.run().unwrap().stats.random_seed, None);
    }

    #[test]
    fn test_custom_objective_is_recorded() {
        let config = scenario_config();
        let (catalog, slots) = small_problem();

        let mut engine = EvolutionEngine::new(&config, catalog, slots)
            .unwrap()
            .with_objective_probe(ObjectiveProbe::new("occupied", |array: &CogArray| {
                Ok(array.num_occupied() as f64)
            }));
        let result = engine.run().unwrap();
        let history = &result.restarts[0].history;

        let trace = &history.objectives["occupied"];
        assert_eq!(trace.of_best.len(), history.best_fitness.len());
        assert_eq!(trace.max.len(), history.best_fitness.len());
        assert!(trace.of_best.iter().chain(&trace.max).all(|&v| v == 2.0));
    }

    #[test]
    fn test_selection_methods_return_valid_indices() {
        let (catalog, slots) = small_problem();
        for selection in [
            SelectionMethod::Tournament { size: 3 },
            SelectionMethod::RankBased,
            SelectionMethod::RouletteWheel,
        ] {
            let config = SearchConfig {
                population_size: 6,
                selection,
                random_seed: Some(21),
                ..Default::default()
            };
            let mut engine = EvolutionEngine::new(&config, catalog.clone(), slots.clone()).unwrap();
            let generation = engine.initialize().unwrap();
            for _ in 0..50 {
                assert!(engine.select_index(&generation) < generation.len());
            }
        }
    }

    #[test]
    fn test_no_mutation_probabilities_skip_events() {
        let scheme = BreedingScheme {
            crossover: 0.0,
            one_point: 0.0,
            two_point: 0.0,
        };
        let config = SearchConfig {
            population_size: 5,
            iteration: IterationConfig {
                breeding: scheme,
                ..IterationConfig::default().with_generation_info(1, 1, 1, 0.0)
            },
            random_seed: Some(2),
            ..Default::default()
        };
        let (catalog, slots) = small_problem();
        let mut engine = EvolutionEngine::new(&config, catalog, slots).unwrap();

        let initial = engine.initialize().unwrap();
        let next = engine.breed(&initial).unwrap();
        // Without crossover or mutation every child is a copy of a member.
        let originals: Vec<_> = initial.members().iter().map(|c| c.layout.rows()).collect();
        assert!(next.members().iter().all(|c| originals.contains(&c.layout.rows())));
    }

    #[test]
    fn test_invalid_config_fails_before_search() {
        let mut config = scenario_config();
        config.fitness = FitnessConfig {
            function: FitnessKind::InversionMatrix,
            weights: Weights::new(1.0, 0.0, 1.0),
        };
        let (catalog, slots) = small_problem();
        assert!(matches!(
            EvolutionEngine::new(&config, catalog, slots),
            Err(SearchError::Fitness(FitnessError::SingularWeights { .. }))
        ));
    }
}
