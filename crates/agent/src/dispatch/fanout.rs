use futures::future::join_all;
use std::future::Future;

/// Drive every delivery concurrently and wait for all of them to settle,
/// returning each outcome alongside its key in input order.
///
/// A failed delivery never cancels or short-circuits the others.
pub async fn settle_all<K, F, T>(deliveries: impl IntoIterator<Item = (K, F)>) -> Vec<(K, anyhow::Result<T>)>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let (keys, futures): (Vec<K>, Vec<F>) = deliveries.into_iter().unzip();
    keys.into_iter().zip(join_all(futures).await).collect()
}
