use neatcore::{
    Environment, Fitness, GenomeBuilder, GenomeConfig, Population, Result, ScoringFunction,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::error;
use tracing_subscriber::EnvFilter;

const XOR_INPUT: [[f32; 3]; 4] = [
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
];
const XOR_OUTPUT: [f32; 4] = [0.0, 1.0, 1.0, 0.0];
const GENERATIONS: usize = 300;

/// Four fitness points minus the squared error over the XOR table.
struct Xor {
    next: usize,
    error: f32,
    correct: usize,
}

impl ScoringFunction for Xor {
    fn create_fresh(&self) -> Self {
        Xor {
            next: 0,
            error: 0.0,
            correct: 0,
        }
    }
    fn flush_between_inputs(&self) -> bool {
        true
    }
    fn next_input(&mut self) -> Option<Vec<f32>> {
        XOR_INPUT.get(self.next).map(|input| input.to_vec())
    }
    fn accept_output(&mut self, output: Vec<f32>) {
        let actual = output.first().copied().unwrap_or(0.0);
        let expected = XOR_OUTPUT[self.next];
        self.error += (actual - expected).powi(2);
        if (actual > 0.5) == (expected > 0.5) {
            self.correct += 1;
        }
        self.next += 1;
    }
    fn score(&self) -> Fitness {
        4.0 - self.error
    }
    fn is_winner(&self) -> bool {
        self.correct == XOR_OUTPUT.len()
    }
}

fn run() -> Result<()> {
    let mut environment = Environment::new(150);
    environment.set_add_node(0.03);
    environment.set_add_edge(0.1);
    environment.set_target_species(Some(10));
    let builder = GenomeBuilder::new(GenomeConfig::new(3, 1))?;
    let mut population = Population::new(environment, builder, StdRng::from_entropy())?;
    population.create_first_generation()?;
    let scoring = Xor {
        next: 0,
        error: 0.0,
        correct: 0,
    };
    let mut solved = false;
    for _ in 0..GENERATIONS {
        if population.assess_generation(&scoring)? {
            solved = true;
            break;
        }
        population.next_generation()?;
    }
    let winner = population.individuals().find(|i| i.winner);
    match (solved, winner, population.best_individual()) {
        (true, Some(winner), _) => {
            println!(
                "solved @ gen: {} fitness: {} hidden: {} conns: {}",
                population.generation(),
                winner.fitness,
                winner.genome.pattern().num_hidden(),
                winner.genome.pattern().num_enabled_edges()
            );
            println!("{}", winner.genome);
        }
        (_, _, Some(best)) => println!(
            "FAILED after {} generations, best fitness: {}",
            GENERATIONS, best.fitness
        ),
        (_, _, None) => println!("FAILED, nothing was assessed"),
    }
    Ok(())
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
    if let Err(e) = run() {
        error!("run failed: {}", e);
        std::process::exit(1);
    }
}
