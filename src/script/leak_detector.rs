use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakStats {
    pub objs_created: usize,
    pub objs_released: usize,
    pub proxies_created: usize,
    pub proxies_released: usize,
}

impl LeakStats {
    pub fn live_objs(&self) -> usize {
        self.objs_created - self.objs_released
    }

    pub fn live_proxies(&self) -> usize {
        self.proxies_created - self.proxies_released
    }
}

thread_local! {
    static OBJS_CREATED: Cell<usize> = const { Cell::new(0) };
    static OBJS_RELEASED: Cell<usize> = const { Cell::new(0) };
    static PROXIES_CREATED: Cell<usize> = const { Cell::new(0) };
    static PROXIES_RELEASED: Cell<usize> = const { Cell::new(0) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
    counter.with(|c| c.set(c.get() + 1));
}

pub fn record_obj_created() {
    bump(&OBJS_CREATED);
}

pub fn record_obj_released() {
    bump(&OBJS_RELEASED);
}

pub fn record_proxy_created() {
    bump(&PROXIES_CREATED);
}

pub fn record_proxy_released() {
    bump(&PROXIES_RELEASED);
}

pub fn snapshot() -> LeakStats {
    LeakStats {
        objs_created: OBJS_CREATED.with(Cell::get),
        objs_released: OBJS_RELEASED.with(Cell::get),
        proxies_created: PROXIES_CREATED.with(Cell::get),
        proxies_released: PROXIES_RELEASED.with(Cell::get),
    }
}
