/// Round-robin merge: first items of every list in list order, then the
/// second items, and so on, skipping exhausted lists. Stops at `max`.
pub fn interleave<T>(lists: Vec<Vec<T>>, max: usize) -> Vec<T> {
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::new();

    while out.len() < max {
        let mut progressed = false;
        for iter in iters.iter_mut() {
            if out.len() >= max {
                break;
            }
            if let Some(item) = iter.next() {
                out.push(item);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    out
}
