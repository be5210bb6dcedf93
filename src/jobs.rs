//! Keyed map of independent computations.
//!
//! A [`Job`] packages the per-key inputs, shared read-only parameters and the
//! function to apply. Results come back keyed exactly like the inputs. With
//! the `parallel` feature the keys are processed on the Rayon pool; the
//! function only ever sees its own input and the shared parameters.

use std::collections::BTreeMap;

pub struct Job<K, D, P, F> {
    pub data: BTreeMap<K, D>,
    pub params: P,
    pub func: F,
    parallel: bool,
}

impl<K, D, P, F, R> Job<K, D, P, F>
where
    K: Ord + Clone + Send + Sync,
    D: Sync,
    P: Sync,
    F: Fn(&D, &P) -> R + Sync,
    R: Send,
{
    pub fn new(data: BTreeMap<K, D>, params: P, func: F) -> Self {
        Self {
            data,
            params,
            func,
            parallel: cfg!(feature = "parallel"),
        }
    }

    /// Runtime toggle; has no effect without the `parallel` feature.
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn run(&self) -> BTreeMap<K, R> {
        if self.parallel && self.data.len() > 1 {
            #[cfg(feature = "parallel")]
            {
                return self.run_parallel();
            }
        }
        self.run_sequential()
    }

    fn run_sequential(&self) -> BTreeMap<K, R> {
        self.data
            .iter()
            .map(|(key, item)| (key.clone(), (self.func)(item, &self.params)))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(&self) -> BTreeMap<K, R> {
        use rayon::prelude::*;

        let items: Vec<(&K, &D)> = self.data.iter().collect();
        items
            .into_par_iter()
            .map(|(key, item)| (key.clone(), (self.func)(item, &self.params)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_are_keyed_like_inputs() {
        let data: BTreeMap<(usize, usize), f64> =
            [((0, 1), 1.0), ((0, 2), 2.0), ((1, 2), 3.0)].into_iter().collect();
        let job = Job::new(data, 10.0, |x: &f64, scale: &f64| x * scale);
        let out = job.run();
        assert_eq!(out.len(), 3);
        assert_eq!(out[&(0, 1)], 10.0);
        assert_eq!(out[&(1, 2)], 30.0);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let data: BTreeMap<usize, usize> = (0..64).map(|k| (k, k * k)).collect();
        let f = |x: &usize, offset: &usize| x + offset;
        let seq = Job::new(data.clone(), 3, f).with_parallel(false).run();
        let par = Job::new(data, 3, f).with_parallel(true).run();
        assert_eq!(seq, par);
    }

    #[test]
    fn empty_job_yields_empty_map() {
        let job = Job::new(BTreeMap::<u8, u8>::new(), (), |x: &u8, _: &()| *x);
        assert!(job.is_empty());
        assert!(job.run().is_empty());
    }
}
