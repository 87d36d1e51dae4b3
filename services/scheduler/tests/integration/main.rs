mod cycle_test;
mod db_test;
mod drain_test;
mod unsubscribe_test;
