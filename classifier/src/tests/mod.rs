mod network_tests;
