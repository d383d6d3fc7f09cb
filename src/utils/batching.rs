/// 把列表按固定大小切分成连续的批次
///
/// 只切分不重排，所有批次依次拼接后与原列表完全相同。
pub fn create_batches<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}
