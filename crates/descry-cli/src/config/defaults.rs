use descry::core::basis::RadialBasisKind;
use descry::engine::coulomb::Permutation;
use descry::engine::soap::DerivativeMethod;

/// Built-in experiment settings: the stock NiTi benchmark that runs when no
/// configuration file or CLI override is given.
pub struct DefaultsConfig {
    pub species: Vec<String>,
    pub lattice_constant: f64,
    pub rcut: f64,
    pub nmax: usize,
    pub lmax: usize,
    pub crossover: bool,
    pub periodic: bool,
    pub soap_sweep: (usize, usize),
    pub derivative_sweep: (usize, usize),
    pub cm_sweep: (usize, usize),
    pub rbfs: Vec<RadialBasisKind>,
    pub methods: Vec<DerivativeMethod>,
    pub permutations: Vec<Permutation>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            species: vec!["Ni".to_string(), "Ti".to_string()],
            lattice_constant: 2.993,
            rcut: 3.0,
            nmax: 4,
            lmax: 4,
            crossover: true,
            periodic: true,
            soap_sweep: (5, 15),
            derivative_sweep: (1, 8),
            cm_sweep: (5, 15),
            rbfs: vec![RadialBasisKind::Gto, RadialBasisKind::Polynomial],
            methods: vec![DerivativeMethod::Numerical, DerivativeMethod::Analytical],
            permutations: vec![
                Permutation::None,
                Permutation::SortedL2,
                Permutation::Eigenspectrum,
            ],
        }
    }
}
