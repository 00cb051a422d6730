//! Splitting of ordered command lists into shards recorded in parallel.

/// Default minimal number of commands worth a separate thread.
pub const MIN_COMMANDS_PER_THREAD: usize = 25;

/// Contiguous half-open range `[begin, end)` over concatenation of all command lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shard {
    /// Index of the first command.
    pub begin: usize,
    /// Index past the last command.
    pub end: usize,
}

impl Shard {
    /// Number of commands in the shard.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Check if shard has no commands.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Position of a command within command lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Index of the list.
    pub list: usize,
    /// Index of the command within the list.
    pub index: usize,
}

/// Split commands of lists with `lengths` into shards for `pool_size` threads.
///
/// Every shard but the last gets `max(pool_size * min_per_thread, total) / pool_size` commands,
/// the last one takes the remainder.
/// So small inputs get fewer shards than threads and no commands give no shards.
pub fn shards(lengths: &[usize], pool_size: usize, min_per_thread: usize) -> Vec<Shard> {
    let total: usize = lengths.iter().sum();
    if total == 0 {
        return Vec::new();
    }

    let pool_size = pool_size.max(1);
    let approx = (pool_size * min_per_thread.max(1)).max(total) / pool_size;
    let count = (total / approx).max(1);

    (0..count)
        .map(|index| Shard {
            begin: index * approx,
            end: if index + 1 == count {
                total
            } else {
                (index + 1) * approx
            },
        })
        .collect()
}

/// Find list and index of the command at `begin` in concatenation of lists with `lengths`.
/// Empty lists are skipped.
/// Returns cursor past the last list if `begin` is out of range.
pub fn locate(lengths: impl IntoIterator<Item = usize>, begin: usize) -> Cursor {
    let mut rest = begin;
    let mut list = 0;
    for length in lengths {
        if rest < length {
            return Cursor { list, index: rest };
        }
        rest -= length;
        list += 1;
    }
    Cursor { list, index: 0 }
}

/// Iterate over commands of the shard in order, crossing list boundaries.
pub fn shard_commands<'a, C, L>(lists: &'a [L], shard: Shard) -> impl Iterator<Item = &'a C> + 'a
where
    L: AsRef<[C]>,
    C: 'a,
{
    let Cursor { list, index } = locate(lists.iter().map(|list| list.as_ref().len()), shard.begin);
    lists[list..]
        .iter()
        .enumerate()
        .flat_map(move |(offset, commands)| {
            let commands = commands.as_ref();
            if offset == 0 {
                &commands[index..]
            } else {
                commands
            }
        })
        .take(shard.len())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{rngs::StdRng, Rng, SeedableRng},
    };

    #[test]
    fn three_lists_on_four_threads() {
        let lengths = [10, 5, 40];
        let shards = shards(&lengths, 4, MIN_COMMANDS_PER_THREAD);
        assert_eq!(
            shards,
            vec![Shard { begin: 0, end: 25 }, Shard { begin: 25, end: 55 }]
        );
        assert_eq!(locate(lengths.iter().copied(), 25), Cursor { list: 2, index: 10 });
    }

    #[test]
    fn no_commands_no_shards() {
        assert!(shards(&[], 4, 25).is_empty());
        assert!(shards(&[0, 0, 0], 4, 25).is_empty());
    }

    #[test]
    fn small_input_single_shard() {
        assert_eq!(shards(&[3], 8, 25), vec![Shard { begin: 0, end: 3 }]);
        // Degenerate parameters are clamped.
        assert_eq!(shards(&[3], 0, 0), vec![Shard { begin: 0, end: 3 }]);
    }

    #[test]
    fn large_input_uses_every_thread() {
        let shards = shards(&[1000, 7], 4, 25);
        assert_eq!(shards.len(), 4);
        assert_eq!(shards[0], Shard { begin: 0, end: 251 });
        assert_eq!(shards[3], Shard { begin: 753, end: 1007 });
    }

    #[test]
    fn locate_skips_empty_lists() {
        let lengths = [0, 3, 0, 0, 2];
        assert_eq!(locate(lengths.iter().copied(), 0), Cursor { list: 1, index: 0 });
        assert_eq!(locate(lengths.iter().copied(), 3), Cursor { list: 4, index: 0 });
        assert_eq!(locate(lengths.iter().copied(), 5), Cursor { list: 5, index: 0 });
    }

    #[test]
    fn shard_commands_cross_list_boundaries() {
        let lists = vec![vec![0, 1], vec![], vec![2, 3, 4], vec![5]];
        let commands = shard_commands(&lists, Shard { begin: 1, end: 5 })
            .copied()
            .collect::<Vec<i32>>();
        assert_eq!(commands, vec![1, 2, 3, 4]);
    }

    #[test]
    fn shards_partition_all_commands() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let lengths = (0..rng.gen_range(0..8))
                .map(|_| rng.gen_range(0..120))
                .collect::<Vec<usize>>();
            let pool_size = rng.gen_range(1..17);
            let min = rng.gen_range(1..40);
            let total: usize = lengths.iter().sum();

            let shards = shards(&lengths, pool_size, min);

            let mut next = 0;
            for shard in &shards {
                assert_eq!(shard.begin, next);
                assert!(!shard.is_empty());
                next = shard.end;
            }
            assert_eq!(next, total);

            let lists = lengths
                .iter()
                .scan(0, |start, &length| {
                    let list = (*start..*start + length).collect::<Vec<usize>>();
                    *start += length;
                    Some(list)
                })
                .collect::<Vec<_>>();
            let order = shards
                .iter()
                .flat_map(|&shard| shard_commands(&lists, shard).copied())
                .collect::<Vec<_>>();
            assert_eq!(order, (0..total).collect::<Vec<_>>());
        }
    }
}
