mod fanout_tests;
mod notifier_tests;
mod registry_tests;
