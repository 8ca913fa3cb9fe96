//! Lazy sequences of simulator configurations over a parameter grid.
use crate::error::PseError;
use crate::grid::{ParamValue, ParameterGrid};

/// A setter for one sweepable attribute of a configuration type.
pub type Setter<C> = fn(&mut C, &ParamValue) -> Result<(), PseError>;

/// An optional per-parameter transform applied to a value before assignment.
pub type Transform = fn(&ParamValue) -> ParamValue;

/// A configuration type whose sweepable attributes can be set by name.
///
/// The setter lookup replaces per-point reflection: names are resolved once,
/// when the sequence is constructed.
pub trait Sweepable: Clone {
    /// The setter for the given attribute name, if it is sweepable.
    fn setter(name: &str) -> Option<Setter<Self>>;

    /// Whether the configuration has been finalized and is safe to clone.
    fn is_configured(&self) -> bool;
}

/// A sequence of simulator configurations, one per grid point.
///
/// Each yielded configuration is a clone of the template with the two swept
/// attributes overridden, so runs never share mutable state. The template
/// must be configured before the sequence is built: cloning an unfinalized
/// template is a caller error.
#[derive(Debug, Clone)]
pub struct ConfigSequence<C: Sweepable> {
    template: C,
    grid: ParameterGrid,
    setters: [Setter<C>; 2],
    transforms: [Option<Transform>; 2],
}

impl<C: Sweepable> ConfigSequence<C> {
    /// Build a sequence over the grid, resolving both parameter setters up front.
    pub fn new(template: C, grid: ParameterGrid) -> Result<Self, PseError> {
        if !template.is_configured() {
            return Err(PseError::UnconfiguredTemplate);
        }
        let setter1 = C::setter(&grid.axis1().name)
            .ok_or_else(|| PseError::UnknownParameter(grid.axis1().name.clone()))?;
        let setter2 = C::setter(&grid.axis2().name)
            .ok_or_else(|| PseError::UnknownParameter(grid.axis2().name.clone()))?;
        Ok(ConfigSequence {
            template,
            grid,
            setters: [setter1, setter2],
            transforms: [None, None],
        })
    }

    /// Attach per-parameter value transforms, applied before assignment.
    pub fn with_transforms(
        mut self,
        transform1: Option<Transform>,
        transform2: Option<Transform>,
    ) -> Self {
        self.transforms = [transform1, transform2];
        self
    }

    /// The number of configurations the sequence yields.
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    /// The configuration at the given grid index: a fresh clone of the
    /// template with both swept attributes set.
    pub fn configure_at(&self, index: usize) -> Result<C, PseError> {
        let point = self.grid.point(index).ok_or_else(|| {
            PseError::InvalidParameter(format!(
                "Grid index {} out of bounds ({} points)",
                index,
                self.grid.len()
            ))
        })?;
        let mut config = self.template.clone();
        for (slot, value) in [(0, &point.value1), (1, &point.value2)] {
            match self.transforms[slot] {
                Some(transform) => (self.setters[slot])(&mut config, &transform(value))?,
                None => (self.setters[slot])(&mut config, value)?,
            }
        }
        Ok(config)
    }

    /// A fresh single-pass iterator over all configurations, in row-major
    /// grid order.
    pub fn iter(&self) -> impl Iterator<Item = Result<C, PseError>> + '_ {
        (0..self.len()).map(|index| self.configure_at(index))
    }
}
