mod fcfs;
mod priority;
mod round_robin;
mod sjf;

pub use fcfs::Fcfs;
pub use priority::Priority;
pub use round_robin::RoundRobin;
pub use sjf::Sjf;
