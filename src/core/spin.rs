use core::hint::spin_loop;

const MAX_BACKOFF_ITER: usize = 10;

#[derive(Copy, Clone, Debug, Default)]
pub struct Spin {
    iter: usize,
}

impl Spin {
    pub const fn new() -> Self {
        Self { iter: 0 }
    }

    pub fn reset(&mut self) {
        self.iter = 0;
    }

    pub fn yield_now(&mut self) -> bool {
        if self.iter > MAX_BACKOFF_ITER {
            false
        } else {
            (0..(1 << self.iter)).for_each(|_| spin_loop());
            self.iter += 1;
            true
        }
    }
}
