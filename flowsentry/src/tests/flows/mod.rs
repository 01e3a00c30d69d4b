mod flow_state_test;
