pub trait Batching: Iterator {
    fn batching(self, batch_size: usize) -> Batcher<Self>
    where
        Self: std::marker::Sized,
    {
        Batcher {
            iterator: self,
            batch_size: batch_size.max(1),
        }
    }
}

/// Groups elements in batches of `batch_size`, the last batch keeps whatever is left
pub struct Batcher<T: Iterator> {
    iterator: T,
    batch_size: usize,
}

impl<T: Iterator> Iterator for Batcher<T> {
    type Item = Vec<T::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let output: Vec<T::Item> = self.iterator.by_ref().take(self.batch_size).collect();
        if output.is_empty() {
            None
        } else {
            Some(output)
        }
    }
}

impl<T: ?Sized> Batching for T where T: Iterator {}
