//! Signal identifiers and evaluated boundary values.

/// Index of a signal in the control layer's evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub usize);

impl SignalId {
    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Values of every control signal at one evaluation time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boundary {
    /// Time of the evaluation (s).
    pub t: f64,
    values: Vec<f64>,
}

impl Boundary {
    pub fn new(t: f64, values: Vec<f64>) -> Self {
        Self { t, values }
    }

    /// Value of a resolved signal.
    ///
    /// Ids are produced by the same control layer that filled this boundary,
    /// so they are always in range.
    pub fn get(&self, id: SignalId) -> f64 {
        self.values[id.0]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
